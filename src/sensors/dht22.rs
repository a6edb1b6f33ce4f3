//! DHT22 (AM2302) single-wire temperature/humidity sensor.
//!
//! The sampler busy-polls the data line against a microsecond clock. There is
//! no yield point between the start signal and the last bit; a preemption
//! during a high pulse stretches the measured width and can flip a bit. That
//! precision risk is accepted, the checksum and range checks catch most of it.

use core::fmt;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::config::SensorConfig;
use crate::sensors::line::{MicrosClock, SingleWireLine};

pub const FRAME_LEN: usize = 5;

/// humidity hi, humidity lo, temperature hi, temperature lo, checksum.
pub type RawFrame = [u8; FRAME_LEN];

const HUMIDITY_MAX_TENTHS: u16 = 1_000;
const TEMPERATURE_MIN_TENTHS: i16 = -400;
const TEMPERATURE_MAX_TENTHS: i16 = 800;

/// A validated measurement in fixed-point tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    temperature_tenths: i16,
    humidity_tenths: u16,
}

impl Reading {
    pub const fn new(temperature_tenths: i16, humidity_tenths: u16) -> Self {
        Self {
            temperature_tenths,
            humidity_tenths,
        }
    }

    /// Validate and decode a frame. Humidity is 16-bit big-endian, temperature
    /// is a 15-bit magnitude with the sign in bit 7 of byte 2.
    pub fn from_frame(frame: &RawFrame) -> Result<Self, FrameError> {
        let expected = checksum(frame);
        if expected != frame[4] {
            return Err(FrameError::ChecksumMismatch {
                expected,
                actual: frame[4],
            });
        }

        let humidity_tenths = u16::from_be_bytes([frame[0], frame[1]]);
        let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]) as i16;
        let temperature_tenths = if frame[2] & 0x80 != 0 {
            -magnitude
        } else {
            magnitude
        };

        let reading = Self::new(temperature_tenths, humidity_tenths);
        if !reading.is_plausible() {
            return Err(FrameError::OutOfRange(reading));
        }
        Ok(reading)
    }

    pub fn temperature_tenths(&self) -> i16 {
        self.temperature_tenths
    }

    pub fn humidity_tenths(&self) -> u16 {
        self.humidity_tenths
    }

    pub fn temperature_c(&self) -> f32 {
        f32::from(self.temperature_tenths) / 10.0
    }

    pub fn humidity_pct(&self) -> f32 {
        f32::from(self.humidity_tenths) / 10.0
    }

    /// Humidity within 0-100 %RH and temperature within the -40..80 C rating.
    pub fn is_plausible(&self) -> bool {
        self.humidity_tenths <= HUMIDITY_MAX_TENTHS
            && (TEMPERATURE_MIN_TENTHS..=TEMPERATURE_MAX_TENTHS).contains(&self.temperature_tenths)
    }
}

/// The display line format, e.g. `T:27.3C H:65.2%`.
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.temperature_tenths < 0 { "-" } else { "" };
        let t = self.temperature_tenths.unsigned_abs();
        write!(
            f,
            "T:{}{}.{}C H:{}.{}%",
            sign,
            t / 10,
            t % 10,
            self.humidity_tenths / 10,
            self.humidity_tenths % 10
        )
    }
}

/// Low byte of the sum of the four data bytes.
pub fn checksum(frame: &RawFrame) -> u8 {
    frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    ChecksumMismatch { expected: u8, actual: u8 },
    /// Checksum passed but the values are physically implausible (sampling noise).
    OutOfRange(Reading),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch: expected {expected:02X}, got {actual:02X}"
            ),
            Self::OutOfRange(reading) => write!(
                f,
                "reading out of range: {:.1}C {:.1}%",
                reading.temperature_c(),
                reading.humidity_pct()
            ),
        }
    }
}

impl std::error::Error for FrameError {}

/// Error category; the poller logs failures per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    ChecksumMismatch,
    OutOfRange,
    Gpio,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ChecksumMismatch => "checksum",
            Self::OutOfRange => "invalid response",
            Self::Gpio => "GPIO",
        }
    }
}

impl FrameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::OutOfRange(_) => ErrorKind::OutOfRange,
        }
    }
}

#[derive(Debug)]
pub enum DhtError<E> {
    /// A wait state exceeded the timeout; names the stage that stalled.
    Timeout(&'static str),
    /// A complete frame was sampled but failed validation.
    Frame(FrameError),
    Gpio(E),
}

impl<E> DhtError<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Frame(err) => err.kind(),
            Self::Gpio(_) => ErrorKind::Gpio,
        }
    }
}

impl<E> From<FrameError> for DhtError<E> {
    fn from(err: FrameError) -> Self {
        Self::Frame(err)
    }
}

impl<E: fmt::Display> fmt::Display for DhtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(stage) => write!(f, "timeout waiting for {stage}"),
            Self::Frame(err) => write!(f, "{err}"),
            Self::Gpio(err) => write!(f, "GPIO error: {err}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for DhtError<E> {}

pub struct Dht22<L, C> {
    line: L,
    clock: C,
    config: SensorConfig,
}

impl<L, C> Dht22<L, C>
where
    L: SingleWireLine,
    C: MicrosClock,
{
    pub fn new(line: L, clock: C, config: SensorConfig) -> Self {
        Self {
            line,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// One full transaction: handshake, 40 bits, checksum and range validation.
    pub fn read(&mut self) -> Result<Reading, DhtError<L::Error>> {
        let frame = self.read_frame()?;
        debug!(
            "DHT22 raw data: {:02X} {:02X} {:02X} {:02X} {:02X}",
            frame[0], frame[1], frame[2], frame[3], frame[4]
        );
        Ok(Reading::from_frame(&frame)?)
    }

    /// Handshake and sample the raw frame. Nothing partial is returned on failure.
    pub fn read_frame(&mut self) -> Result<RawFrame, DhtError<L::Error>> {
        let result = self.transact();
        if result.is_err() {
            // Listen with pull-up so the line idles high; keep the first error.
            let _ = self.line.into_input();
        }
        result
    }

    /// Force the line high for `hold`, then restore handshake-ready mode.
    /// Sleeps the calling thread; never call inside a transaction.
    pub fn reset_line(&mut self, hold: Duration) -> Result<(), DhtError<L::Error>> {
        self.line.force_high().map_err(DhtError::Gpio)?;
        thread::sleep(hold);
        self.line.configure_open_drain().map_err(DhtError::Gpio)?;
        Ok(())
    }

    fn transact(&mut self) -> Result<RawFrame, DhtError<L::Error>> {
        // Host start signal.
        self.line.drive_low().map_err(DhtError::Gpio)?;
        self.clock.delay_us(self.config.start_low_us);
        self.line.release().map_err(DhtError::Gpio)?;
        self.clock.delay_us(self.config.release_us);

        self.line.into_input().map_err(DhtError::Gpio)?;
        self.clock.delay_us(self.config.settle_us);

        // Sensor acknowledgement: ~80us low, ~80us high, then low into the first bit.
        self.wait_for_level(false, "response low")?;
        self.wait_for_level(true, "response high")?;
        self.wait_for_level(false, "data start")?;

        let mut frame = [0u8; FRAME_LEN];
        for byte in frame.iter_mut() {
            for _ in 0..8 {
                // ~50us low, then high for ~26us (0) or ~70us (1).
                self.wait_for_level(true, "bit start")?;
                let width = self.wait_for_level(false, "bit end")?;
                *byte <<= 1;
                if width > u64::from(self.config.bit_threshold_us) {
                    *byte |= 1;
                }
            }
        }
        Ok(frame)
    }

    /// Spin until the line reads `high`; returns the microseconds spent waiting.
    #[inline(always)]
    fn wait_for_level(&mut self, high: bool, stage: &'static str) -> Result<u64, DhtError<L::Error>> {
        let timeout = u64::from(self.config.timeout_us);
        let start = self.clock.now_us();
        loop {
            let level = self.line.is_high();
            let elapsed = self.clock.now_us().wrapping_sub(start);
            if level == high {
                return Ok(elapsed);
            }
            if elapsed > timeout {
                return Err(DhtError::Timeout(stage));
            }
        }
    }

    pub fn into_parts(self) -> (L, C) {
        (self.line, self.clock)
    }
}

#[cfg(test)]
pub(crate) mod sim {
    //! Scripted sensor waveform on a simulated clock.

    use std::cell::{Cell, RefCell};
    use std::convert::Infallible;
    use std::rc::Rc;

    use super::RawFrame;
    use crate::sensors::line::{MicrosClock, SingleWireLine};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LineEvent {
        DriveLow,
        Release,
        Input,
        ForceHigh,
        OpenDrain,
    }

    /// Each clock read advances time by 1us so spin loops make progress.
    pub struct SimClock {
        now: Rc<Cell<u64>>,
    }

    impl MicrosClock for SimClock {
        fn now_us(&mut self) -> u64 {
            let t = self.now.get() + 1;
            self.now.set(t);
            t
        }

        fn delay_us(&mut self, us: u32) {
            self.now.set(self.now.get() + u64::from(us));
        }
    }

    /// Replays `(level, duration_us)` segments once the host switches to input.
    /// Past the end of the script the pull-up holds the line high.
    pub struct SimLine {
        now: Rc<Cell<u64>>,
        script: Vec<(bool, u32)>,
        listening_since: Option<u64>,
        driven_high: bool,
        pub events: Rc<RefCell<Vec<LineEvent>>>,
    }

    impl SimLine {
        fn level_at(&self, offset: u64) -> bool {
            let mut end = 0u64;
            for (level, duration) in &self.script {
                end += u64::from(*duration);
                if offset < end {
                    return *level;
                }
            }
            true
        }
    }

    impl SingleWireLine for SimLine {
        type Error = Infallible;

        fn drive_low(&mut self) -> Result<(), Infallible> {
            self.listening_since = None;
            self.driven_high = false;
            self.events.borrow_mut().push(LineEvent::DriveLow);
            Ok(())
        }

        fn release(&mut self) -> Result<(), Infallible> {
            self.driven_high = true;
            self.events.borrow_mut().push(LineEvent::Release);
            Ok(())
        }

        fn into_input(&mut self) -> Result<(), Infallible> {
            if self.listening_since.is_none() {
                self.listening_since = Some(self.now.get());
            }
            self.events.borrow_mut().push(LineEvent::Input);
            Ok(())
        }

        fn is_high(&mut self) -> bool {
            match self.listening_since {
                Some(since) => self.level_at(self.now.get() - since),
                None => self.driven_high,
            }
        }

        fn force_high(&mut self) -> Result<(), Infallible> {
            self.listening_since = None;
            self.driven_high = true;
            self.events.borrow_mut().push(LineEvent::ForceHigh);
            Ok(())
        }

        fn configure_open_drain(&mut self) -> Result<(), Infallible> {
            self.events.borrow_mut().push(LineEvent::OpenDrain);
            Ok(())
        }
    }

    pub fn pair(script: Vec<(bool, u32)>) -> (SimLine, SimClock) {
        let now = Rc::new(Cell::new(0));
        let line = SimLine {
            now: now.clone(),
            script,
            listening_since: None,
            driven_high: true,
            events: Rc::new(RefCell::new(Vec::new())),
        };
        (line, SimClock { now })
    }

    /// Acknowledgement plus 40 bits with the given high-pulse widths for 0 and 1.
    pub fn waveform_with_widths(frame: &RawFrame, zero_us: u32, one_us: u32) -> Vec<(bool, u32)> {
        let mut script = vec![(true, 20), (false, 80), (true, 80)];
        for byte in frame {
            for bit in (0..8).rev() {
                script.push((false, 50));
                let one = byte & (1 << bit) != 0;
                script.push((true, if one { one_us } else { zero_us }));
            }
        }
        script.push((false, 50));
        script
    }

    pub fn waveform(frame: &RawFrame) -> Vec<(bool, u32)> {
        waveform_with_widths(frame, 26, 70)
    }
}
