//! Core data types shared by the bridge tasks.
//!
//! - [`Sample`]: one decoded sensor reading from the device
//! - [`LogRecord`]: a timestamped entry for the persistent log
//! - [`SessionClock`]: elapsed-time source shared by the log producers

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Sensor reading from the steering device.
///
/// The binary protocol only carries `delta` and `deltad`; `cadence` and
/// `brake` stay zero unless the CSV line protocol is in use.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Steer angle (rad)
    pub delta: f32,
    /// Steer rate (rad/s)
    pub deltad: f32,
    /// Pedal cadence
    pub cadence: f32,
    /// Brake engaged
    pub brake: bool,
}

impl Sample {
    /// Sample as reported by the binary protocol
    pub fn new(delta: f32, deltad: f32) -> Self {
        Self {
            delta,
            deltad,
            cadence: 0.0,
            brake: false,
        }
    }

    /// Sample with every field populated (CSV line protocol)
    pub fn with_pedals(delta: f32, deltad: f32, cadence: f32, brake: bool) -> Self {
        Self {
            delta,
            deltad,
            cadence,
            brake,
        }
    }
}

/// Payload of a log record: either a full sample or a raw commanded torque
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LogPayload {
    Sample(Sample),
    Torque(f32),
}

/// Timestamped log entry produced by the sensor and actuator tasks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Seconds since the bridge started
    pub elapsed: f64,
    pub payload: LogPayload,
}

impl LogRecord {
    pub fn sample(elapsed: f64, sample: Sample) -> Self {
        Self {
            elapsed,
            payload: LogPayload::Sample(sample),
        }
    }

    pub fn torque(elapsed: f64, raw: f32) -> Self {
        Self {
            elapsed,
            payload: LogPayload::Torque(raw),
        }
    }
}

/// Monotonic session start shared by every log producer (copied, not locked)
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    t0: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self { t0: Instant::now() }
    }

    /// Seconds elapsed since the session started
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.t0.elapsed().as_secs_f64()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}
