//! Actuator command safety

pub mod limits;

pub use limits::{TorqueLimits, limit};
