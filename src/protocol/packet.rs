//! Fixed binary layout for sensor samples and torque commands
//!
//! ```text
//! device → host:  ['s'] [delta: f32 LE] [deltad: f32 LE] ['e']   (10 bytes)
//! host → device:  ['s'] [torque: f32 LE] ['e']                   (6 bytes)
//! ```
//!
//! Both directions use little-endian IEEE-754 floats.

use super::FrameError;
use super::constants::{
    END_BYTE, SAMPLE_CANDIDATE_LEN, SAMPLE_FRAME_LEN, SAMPLE_PAYLOAD_LEN, START_BYTE,
    TORQUE_FRAME_LEN,
};
use crate::core::types::Sample;

/// Encode a torque command frame
#[inline]
pub fn encode_torque(torque: f32) -> [u8; TORQUE_FRAME_LEN] {
    let mut frame = [0u8; TORQUE_FRAME_LEN];
    frame[0] = START_BYTE;
    frame[1..5].copy_from_slice(&torque.to_le_bytes());
    frame[5] = END_BYTE;
    frame
}

/// Decode a candidate frame (`START` followed by the sample payload, no `END`)
pub fn decode_sample(candidate: &[u8]) -> Result<Sample, FrameError> {
    let Some((&first, payload)) = candidate.split_first() else {
        return Err(FrameError::BadLength {
            expected: SAMPLE_PAYLOAD_LEN,
            actual: 0,
        });
    };
    if first != START_BYTE {
        return Err(FrameError::BadStart { found: first });
    }
    if payload.len() != SAMPLE_PAYLOAD_LEN {
        return Err(FrameError::BadLength {
            expected: SAMPLE_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    let delta = f32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let deltad = f32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
    Ok(Sample::new(delta, deltad))
}

/// Encode a complete device-side sample frame.
///
/// The host never sends these; used for device simulation and tests.
pub fn encode_sample_frame(delta: f32, deltad: f32) -> [u8; SAMPLE_FRAME_LEN] {
    let mut frame = [0u8; SAMPLE_FRAME_LEN];
    frame[0] = START_BYTE;
    frame[1..5].copy_from_slice(&delta.to_le_bytes());
    frame[5..9].copy_from_slice(&deltad.to_le_bytes());
    frame[SAMPLE_CANDIDATE_LEN] = END_BYTE;
    frame
}

/// Encode a torque command for the CSV line protocol
pub fn encode_torque_line(torque: f32) -> Vec<u8> {
    format!("{}\n", torque).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_encode_torque_layout() {
        let frame = encode_torque(3.58);
        assert_eq!(frame[0], b's');
        assert_eq!(&frame[1..5], &3.58f32.to_le_bytes());
        assert_eq!(frame[5], b'e');
    }

    #[test]
    fn test_zero_torque_frame() {
        assert_eq!(encode_torque(0.0), [b's', 0, 0, 0, 0, b'e']);
    }

    #[test]
    fn test_decode_sample_frame() {
        let frame = encode_sample_frame(1.57, -0.25);
        let sample = decode_sample(&frame[..SAMPLE_CANDIDATE_LEN]).unwrap();
        assert_relative_eq!(sample.delta, 1.57);
        assert_relative_eq!(sample.deltad, -0.25);
        assert_eq!(sample.cadence, 0.0);
        assert!(!sample.brake);
    }

    #[test]
    fn test_decode_rejects_bad_start() {
        let mut frame = encode_sample_frame(0.5, 0.5);
        frame[0] = b'x';
        assert_eq!(
            decode_sample(&frame[..SAMPLE_CANDIDATE_LEN]),
            Err(FrameError::BadStart { found: b'x' })
        );
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let result = decode_sample(&[START_BYTE, 1, 2, 3]);
        assert_eq!(
            result,
            Err(FrameError::BadLength {
                expected: 8,
                actual: 3
            })
        );
    }

    #[test]
    fn test_torque_line() {
        assert_eq!(encode_torque_line(0.0), b"0\n".to_vec());
        assert_eq!(encode_torque_line(-1.5), b"-1.5\n".to_vec());
    }
}
