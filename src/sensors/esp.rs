//! ESP-IDF backing for the single-wire line and the microsecond clock.

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, InputOutput, PinDriver, Pull};
use esp_idf_hal::sys::EspError;
use esp_idf_sys::{self as sys, esp};

use crate::sensors::line::{MicrosClock, SingleWireLine};

/// Owns the sensor pin driver; holding it is what keeps every other task off the pin.
pub struct EspLine {
    pin: PinDriver<'static, AnyIOPin, InputOutput>,
}

impl EspLine {
    // DHT22 requires open-drain I/O with pull-up; we drive low and release high.
    pub fn new(pin: AnyIOPin) -> Result<Self, EspError> {
        let mut pin = PinDriver::input_output_od(pin)?;
        pin.set_pull(Pull::Up)?;
        pin.set_high()?;
        Ok(Self { pin })
    }

    pub fn gpio(&self) -> i32 {
        self.pin.pin()
    }

    fn set_direction(&mut self, mode: sys::gpio_mode_t) -> Result<(), EspError> {
        esp!(unsafe { sys::gpio_set_direction(self.pin.pin(), mode) })
    }
}

impl SingleWireLine for EspLine {
    type Error = EspError;

    fn drive_low(&mut self) -> Result<(), EspError> {
        self.set_direction(sys::gpio_mode_t_GPIO_MODE_OUTPUT)?;
        self.pin.set_low()
    }

    fn release(&mut self) -> Result<(), EspError> {
        self.pin.set_high()
    }

    fn into_input(&mut self) -> Result<(), EspError> {
        self.set_direction(sys::gpio_mode_t_GPIO_MODE_INPUT)?;
        esp!(unsafe { sys::gpio_pullup_en(self.pin.pin()) })
    }

    fn is_high(&mut self) -> bool {
        self.pin.is_high()
    }

    fn force_high(&mut self) -> Result<(), EspError> {
        self.set_direction(sys::gpio_mode_t_GPIO_MODE_OUTPUT)?;
        self.pin.set_high()
    }

    fn configure_open_drain(&mut self) -> Result<(), EspError> {
        self.set_direction(sys::gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD)?;
        self.pin.set_pull(Pull::Up)?;
        self.pin.set_high()
    }
}

/// esp_timer for timestamps, ROM busy-wait for delays.
pub struct EspClock;

impl MicrosClock for EspClock {
    fn now_us(&mut self) -> u64 {
        unsafe { sys::esp_timer_get_time() as u64 }
    }

    fn delay_us(&mut self, us: u32) {
        Ets::delay_us(us);
    }
}
