// main.rs
// Car board (ESP32): DHT22 on GPIO4 polled by a dedicated thread, readings
// pushed to row 1 of the 16x2 character display, relay on GPIO12 held off.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::thread;
    use std::time::Duration;

    use anyhow::anyhow;
    use car_board::board::Board;
    use car_board::config::{PollConfig, SensorConfig};
    use car_board::display::{LogDisplay, SENSOR_ROW};
    use car_board::poller::spawn_poller;
    use esp_idf_svc::log::EspLogger;
    use log::info;

    esp_idf_sys::link_patches();
    EspLogger::initialize_default();

    let mut lcd = LogDisplay::new();
    lcd.print(0, "Car Board Ready");
    lcd.print(SENSOR_ROW, "Init DHT22...");

    let Board { dht22, relay } = Board::init(SensorConfig::from_env())?;
    info!(
        "DHT22 timeout {}us, bit threshold {}us",
        dht22.config().timeout_us,
        dht22.config().bit_threshold_us
    );

    // Stable supply before the sensor task starts its own warm-up.
    thread::sleep(Duration::from_millis(1000));

    let poller = spawn_poller(dht22, lcd, PollConfig::from_env())?;
    info!("DHT22 task started");

    // The relay driver must outlive the poller; dropping it would reset the pin.
    let _relay = relay;
    poller
        .join()
        .map_err(|_| anyhow!("DHT22 task panicked"))?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("car-board runs on ESP-IDF targets only; use `cargo test --lib` on the host");
}
