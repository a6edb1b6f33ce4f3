pub mod dht22;
pub mod line;

#[cfg(target_os = "espidf")]
pub mod esp;

pub use dht22::{Dht22, DhtError, Reading};
