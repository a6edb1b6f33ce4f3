fn main() {
    // Propagate ESP-IDF link/cfg/include args from esp-idf-sys.
    if let Err(err) = embuild::build::LinkArgs::output_propagated("ESP_IDF") {
        println!("cargo:warning=esp-idf link args not propagated: {err}");
    }
    if let Err(err) = embuild::build::CfgArgs::output_propagated("ESP_IDF") {
        println!("cargo:warning=esp-idf cfg args not propagated: {err}");
    }

    // Sensor policy overrides read through option_env! in src/config.rs.
    for var in [
        "DHT_TIMEOUT_US",
        "DHT_BIT_THRESHOLD_US",
        "DHT_ERROR_THRESHOLD",
        "DHT_RESET_THRESHOLD",
        "DHT_INTERVAL_MS",
        "DHT_RETRY_INTERVAL_MS",
        "DHT_WARMUP_MS",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }
}
