//! Constants for the steering device serial protocol

// Frame markers
pub const START_BYTE: u8 = b's'; // 0x73
pub const END_BYTE: u8 = b'e'; // 0x65

// Payload sizes
pub const SAMPLE_PAYLOAD_LEN: usize = 8; // delta(f32) + deltad(f32)
pub const TORQUE_PAYLOAD_LEN: usize = 4; // torque(f32)

// Frame sizes
pub const SAMPLE_FRAME_LEN: usize = 1 + SAMPLE_PAYLOAD_LEN + 1; // START + payload + END
pub const TORQUE_FRAME_LEN: usize = 1 + TORQUE_PAYLOAD_LEN + 1;

/// Bytes the decoder must hold (START + payload) before an END byte terminates a frame
pub const SAMPLE_CANDIDATE_LEN: usize = 1 + SAMPLE_PAYLOAD_LEN;

// CSV line protocol
pub const CSV_LINE_TERMINATOR: u8 = b'\n';
pub const CSV_FIELD_COUNT: usize = 4; // delta, deltad, cadence, brake
/// Longest unterminated CSV line kept before the buffer is discarded
pub const CSV_MAX_LINE_LEN: usize = 256;

// Actuator torque ratings (N·m)
pub const MAX_TORQUE_PEAK: f64 = 3.58;
/// Continuous rating, informational only; saturation uses the peak rating
pub const MAX_TORQUE_CONT: f64 = 2.12;
pub const DEFAULT_TORQUE_SCALE: f64 = 1.0;

// Display conversion
pub const RAD_PER_DEG: f32 = std::f32::consts::PI / 180.0;
