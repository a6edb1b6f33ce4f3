use anyhow::Result;
use esp_idf_hal::gpio::{AnyIOPin, Gpio12, Output, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_sys::{self as sys, esp};
use log::info;

use crate::config::SensorConfig;
use crate::sensors::esp::{EspClock, EspLine};
use crate::sensors::Dht22;

// DHT22 data line. Must have a pull-up (internal or external ~4.7k).
pub const DHT_GPIO: i32 = 4;
// Relay driving the car lights, active high.
pub const RELAY_GPIO: i32 = 12;

pub struct Board {
    pub dht22: Dht22<EspLine, EspClock>,
    pub relay: PinDriver<'static, Gpio12, Output>,
}

impl Board {
    pub fn init(sensor: SensorConfig) -> Result<Self> {
        let Peripherals { pins, .. } = Peripherals::take()?;

        let line = EspLine::new(AnyIOPin::from(pins.gpio4))?;
        info!("DHT22 sensor on GPIO{}", line.gpio());
        let dht22 = Dht22::new(line, EspClock, sensor);

        // Pull-down keeps the relay off while the pin floats during boot.
        let mut relay = PinDriver::output(pins.gpio12)?;
        esp!(unsafe { sys::gpio_pulldown_en(RELAY_GPIO) })?;
        relay.set_low()?;
        info!("Relay initialized on pin {}", RELAY_GPIO);

        Ok(Self { dht22, relay })
    }
}
