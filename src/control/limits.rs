//! Torque saturation applied to every actuator command

use crate::config::ControlConfig;
use crate::protocol::constants::{DEFAULT_TORQUE_SCALE, MAX_TORQUE_CONT, MAX_TORQUE_PEAK};

/// Scale and saturate a commanded torque.
///
/// Returns `None` when the scaled value is NaN, meaning the command must be
/// suppressed. Magnitudes above `peak` are clamped with their sign kept.
pub fn limit(raw: f64, scale: f64, peak: f64) -> Option<f32> {
    let t = raw * scale;
    if t.is_nan() {
        return None;
    }
    let t = if t.abs() > peak { peak.copysign(t) } else { t };
    Some(t as f32)
}

/// Torque limits for safe actuator operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorqueLimits {
    /// Factor applied to inbound commands before saturation
    pub scale: f64,
    /// Peak torque (N·m), the only enforced bound
    pub peak: f64,
    /// Continuous rating (N·m), reported but not enforced
    pub continuous: f64,
}

impl TorqueLimits {
    /// Create from config
    pub fn from_config(config: &ControlConfig) -> Self {
        Self {
            scale: config.torque_scale,
            peak: config.torque_limit,
            continuous: MAX_TORQUE_CONT,
        }
    }

    /// Apply scaling and saturation
    #[inline]
    pub fn apply(&self, raw: f64) -> Option<f32> {
        limit(raw, self.scale, self.peak)
    }
}

impl Default for TorqueLimits {
    fn default() -> Self {
        Self {
            scale: DEFAULT_TORQUE_SCALE,
            peak: MAX_TORQUE_PEAK,
            continuous: MAX_TORQUE_CONT,
        }
    }
}
