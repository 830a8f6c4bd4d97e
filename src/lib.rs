//! torque-bridge - Serial-to-UDP bridge for a torque-feedback steering device
//!
//! The device streams steer angle and rate over a serial link and accepts
//! torque commands back. This library relays samples to a remote control
//! loop as XML datagrams, relays the loop's torque commands to the device
//! after saturation, and records both directions to a session log.

pub mod config;
pub mod control;
pub mod core;
pub mod error;
pub mod protocol;
pub mod recorder;
pub mod streaming;
pub mod supervisor;
pub mod transport;

// Re-export commonly used types
pub use config::{BridgeConfig, ConfigOverrides};
pub use error::{Error, Result};
pub use supervisor::{Bridge, ShutdownReport};
