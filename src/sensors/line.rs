//! Hardware capabilities the single-wire driver needs.
//!
//! The driver only sees these two traits; the ESP-IDF adapter lives in
//! [`crate::sensors::esp`] and host tests plug in a simulated waveform.

/// One bidirectional GPIO wired to the sensor data pin (external or internal pull-up).
pub trait SingleWireLine {
    type Error: core::fmt::Debug;

    /// Output mode, actively pulling the line low.
    fn drive_low(&mut self) -> Result<(), Self::Error>;

    /// Output mode, line high.
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Stop driving and listen: input with pull-up, output disabled.
    fn into_input(&mut self) -> Result<(), Self::Error>;

    /// Sample the current level. Called from the tight sampling loop.
    fn is_high(&mut self) -> bool;

    /// Push-pull output held high; used to power-cycle a stuck sensor.
    fn force_high(&mut self) -> Result<(), Self::Error>;

    /// Back to open-drain with pull-up, ready for the next handshake.
    fn configure_open_drain(&mut self) -> Result<(), Self::Error>;
}

/// Monotonic microsecond clock plus a busy delay.
pub trait MicrosClock {
    fn now_us(&mut self) -> u64;

    /// Busy wait, never yields to the scheduler.
    fn delay_us(&mut self, us: u32);
}
