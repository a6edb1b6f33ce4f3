use std::time::Duration;

use log::warn;

// Build-time overrides, same mechanism as the WiFi/MQTT settings.
const DHT_TIMEOUT_US: Option<&str> = option_env!("DHT_TIMEOUT_US");
const DHT_BIT_THRESHOLD_US: Option<&str> = option_env!("DHT_BIT_THRESHOLD_US");
const DHT_ERROR_THRESHOLD: Option<&str> = option_env!("DHT_ERROR_THRESHOLD");
const DHT_RESET_THRESHOLD: Option<&str> = option_env!("DHT_RESET_THRESHOLD");
const DHT_INTERVAL_MS: Option<&str> = option_env!("DHT_INTERVAL_MS");
const DHT_RETRY_INTERVAL_MS: Option<&str> = option_env!("DHT_RETRY_INTERVAL_MS");
const DHT_WARMUP_MS: Option<&str> = option_env!("DHT_WARMUP_MS");

/// Timing of one DHT22 transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    /// Host start signal, line held low. Datasheet minimum is 1ms.
    pub start_low_us: u32,
    /// Line released high before switching to input (20-40us).
    pub release_us: u32,
    /// Pause after switching to input before the first level check.
    pub settle_us: u32,
    /// Upper bound for every single wait state.
    pub timeout_us: u32,
    /// High pulses longer than this decode to a 1 bit.
    pub bit_threshold_us: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            start_low_us: 5_000,
            release_us: 30,
            settle_us: 5,
            timeout_us: 10_000,
            bit_threshold_us: 40,
        }
    }
}

impl SensorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_us: parse_or(DHT_TIMEOUT_US, defaults.timeout_us),
            bit_threshold_us: parse_or(DHT_BIT_THRESHOLD_US, defaults.bit_threshold_us),
            ..defaults
        }
    }
}

/// Retry, backoff and reset policy of the polling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Consecutive failures before the display shows the error placeholder.
    pub error_threshold: u32,
    /// Consecutive failures before the line is reset (only after a first success).
    pub reset_threshold: u32,
    pub interval: Duration,
    pub retry_interval: Duration,
    /// Power-on stabilisation before the first read.
    pub warmup: Duration,
    /// How long the line is forced high during a reset.
    pub reset_hold: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            error_threshold: 5,
            reset_threshold: 10,
            interval: Duration::from_millis(2_000),
            retry_interval: Duration::from_millis(3_000),
            warmup: Duration::from_millis(2_000),
            reset_hold: Duration::from_millis(1_000),
        }
    }
}

impl PollConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            error_threshold: parse_or(DHT_ERROR_THRESHOLD, defaults.error_threshold),
            reset_threshold: parse_or(DHT_RESET_THRESHOLD, defaults.reset_threshold),
            interval: parse_millis_or(DHT_INTERVAL_MS, defaults.interval),
            retry_interval: parse_millis_or(DHT_RETRY_INTERVAL_MS, defaults.retry_interval),
            warmup: parse_millis_or(DHT_WARMUP_MS, defaults.warmup),
            ..defaults
        }
        .consistent()
    }

    /// Reset must trip after the error display, otherwise every reset clears
    /// the counter before the error is ever shown. Zero intervals would poll
    /// the sensor back-to-back.
    pub fn consistent(self) -> Self {
        let defaults = Self::default();
        let mut config = self;
        if config.error_threshold == 0 {
            config.error_threshold = defaults.error_threshold;
        }
        if config.reset_threshold <= config.error_threshold {
            let raised = config.error_threshold.saturating_add(1);
            warn!(
                "DHT22 reset threshold {} not above error threshold {}, using {}",
                config.reset_threshold, config.error_threshold, raised
            );
            config.reset_threshold = raised;
        }
        if config.interval.is_zero() {
            config.interval = defaults.interval;
        }
        if config.retry_interval.is_zero() {
            config.retry_interval = defaults.retry_interval;
        }
        config
    }
}

fn parse_or(value: Option<&str>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn parse_millis_or(value: Option<&str>, default: Duration) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .map(Duration::from_millis)
        .unwrap_or(default)
}
