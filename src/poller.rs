//! Periodic sensor polling with backoff, error display and line recovery.

use core::fmt;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::config::PollConfig;
use crate::display::ReadingSink;
use crate::sensors::dht22::{Dht22, DhtError, ErrorKind};
use crate::sensors::line::{MicrosClock, SingleWireLine};
use crate::sensors::Reading;

const TASK_NAME: &str = "dht22";
const TASK_STACK_SIZE: usize = 8 * 1024;

/// A read failure the poller can classify for its logs.
pub trait SensorFault: fmt::Display {
    fn kind(&self) -> ErrorKind;
}

impl<E: fmt::Display> SensorFault for DhtError<E> {
    fn kind(&self) -> ErrorKind {
        DhtError::kind(self)
    }
}

/// What the polling loop needs from a sensor.
pub trait PolledSensor {
    type Error: SensorFault;

    fn read(&mut self) -> Result<Reading, Self::Error>;

    /// Recovery after sustained failure: hold the line high, then re-arm it.
    fn reset(&mut self, hold: Duration) -> Result<(), Self::Error>;
}

impl<L, C> PolledSensor for Dht22<L, C>
where
    L: SingleWireLine,
    L::Error: fmt::Display,
    C: MicrosClock,
{
    type Error = DhtError<L::Error>;

    fn read(&mut self) -> Result<Reading, Self::Error> {
        Dht22::read(self)
    }

    fn reset(&mut self, hold: Duration) -> Result<(), Self::Error> {
        self.reset_line(hold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting out the power-on warm-up; no read attempted yet.
    Idle,
    Polling,
}

/// Counters owned by the polling task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    pub consecutive_failures: u32,
    /// Successful reads since boot; a line reset leaves it alone.
    pub successes: u32,
    /// Kind of the latest failure in the current streak.
    pub last_error: Option<ErrorKind>,
}

pub struct Poller {
    config: PollConfig,
    state: PollState,
    phase: Phase,
}

impl Poller {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config: config.consistent(),
            state: PollState::default(),
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advance one cycle and return how long to sleep before the next one.
    /// The first call only leaves `Idle` and asks for the warm-up delay.
    pub fn step<S, D>(&mut self, sensor: &mut S, sink: &mut D) -> Duration
    where
        S: PolledSensor,
        D: ReadingSink,
    {
        if self.phase == Phase::Idle {
            self.phase = Phase::Polling;
            return self.config.warmup;
        }

        match sensor.read() {
            Ok(reading) => {
                info!(
                    "DHT22 readings - Temp: {:.1}C, Humidity: {:.1}%",
                    reading.temperature_c(),
                    reading.humidity_pct()
                );
                sink.show_reading(&reading);
                self.state.consecutive_failures = 0;
                self.state.successes = self.state.successes.saturating_add(1);
                self.state.last_error = None;
                self.config.interval
            }
            Err(err) => {
                self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
                let failures = self.state.consecutive_failures;
                let kind = err.kind();
                self.state.last_error = Some(kind);
                error!("DHT22 {} error: {} (retry {})", kind.label(), err, failures);

                if failures == self.config.error_threshold {
                    sink.show_error();
                }

                if failures >= self.config.reset_threshold && self.state.successes > 0 {
                    warn!("Too many failures, resetting DHT22 connection");
                    if let Err(err) = sensor.reset(self.config.reset_hold) {
                        error!("DHT22 line reset failed: {}", err);
                    }
                    self.state.consecutive_failures = 0;
                }

                self.config.retry_interval
            }
        }
    }

    /// Poll forever. Sleeping between attempts is the task's only yield point.
    pub fn run<S, D>(&mut self, sensor: &mut S, sink: &mut D) -> !
    where
        S: PolledSensor,
        D: ReadingSink,
    {
        loop {
            let wait = self.step(sensor, sink);
            thread::sleep(wait);
        }
    }
}

/// Start the polling loop on its own thread. The sensor moves into that
/// thread, which becomes the only context touching the pin.
pub fn spawn_poller<S, D>(mut sensor: S, mut sink: D, config: PollConfig) -> io::Result<JoinHandle<()>>
where
    S: PolledSensor + Send + 'static,
    D: ReadingSink + Send + 'static,
{
    thread::Builder::new()
        .name(TASK_NAME.into())
        .stack_size(TASK_STACK_SIZE)
        .spawn(move || {
            let mut poller = Poller::new(config);
            poller.run(&mut sensor, &mut sink)
        })
}
