//! Car board firmware: DHT22 climate readout feeding the character display.
//!
//! Everything except [`board`] and [`sensors::esp`] is hardware independent
//! and builds on the host for unit tests.

pub mod config;
pub mod display;
pub mod poller;
pub mod sensors;

#[cfg(target_os = "espidf")]
pub mod board;
