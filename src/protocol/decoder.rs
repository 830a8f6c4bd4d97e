//! Stream decoders turning raw serial bytes into samples
//!
//! - `FrameDecoder`: byte-at-a-time resynchronizing framer for the binary protocol
//! - `CsvDecoder`: newline-delimited `delta,deltad,cadence,brake` lines
//!
//! Both return one `Result` per completed frame. Errors are local to that
//! frame; the decoder keeps going on the next byte with an empty buffer.

use super::FrameError;
use super::constants::{
    CSV_FIELD_COUNT, CSV_LINE_TERMINATOR, CSV_MAX_LINE_LEN, END_BYTE, SAMPLE_CANDIDATE_LEN,
};
use super::packet::decode_sample;
use crate::core::types::Sample;

/// Accumulated bytes beyond which only the trailing candidate window is kept
const MAX_ACCUMULATED: usize = 256;

/// Decoder seam used by the sensor publisher
pub trait SampleDecoder: Send {
    /// Consume `bytes`, returning every frame they complete
    fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Sample, FrameError>>;
}

/// Resynchronizing decoder for `START | payload[8] | END` frames.
///
/// An END byte only terminates a frame once at least `START + payload` bytes
/// have accumulated, so END values inside float payloads are tolerated.
/// When more than that has accumulated the trailing window is used and older
/// bytes are treated as noise. A START value inside the payload cannot be
/// detected.
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_ACCUMULATED),
        }
    }

    /// Number of bytes currently held
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn push_byte(&mut self, byte: u8) -> Option<Result<Sample, FrameError>> {
        if byte != END_BYTE || self.buffer.len() < SAMPLE_CANDIDATE_LEN {
            self.buffer.push(byte);
            if self.buffer.len() > MAX_ACCUMULATED {
                // Only the trailing window can ever become a candidate
                let excess = self.buffer.len() - SAMPLE_CANDIDATE_LEN;
                self.buffer.drain(..excess);
            }
            return None;
        }

        let start = self.buffer.len() - SAMPLE_CANDIDATE_LEN;
        if start > 0 {
            log::trace!("Discarding {} bytes before frame", start);
        }
        let result = decode_sample(&self.buffer[start..]);
        self.buffer.clear();
        Some(result)
    }
}

impl SampleDecoder for FrameDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Sample, FrameError>> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoder for the CSV line protocol (`delta,deltad,cadence,brake\n`)
pub struct CsvDecoder {
    line: Vec<u8>,
}

impl CsvDecoder {
    pub fn new() -> Self {
        Self {
            line: Vec::with_capacity(CSV_MAX_LINE_LEN),
        }
    }

    fn finish_line(&mut self) -> Option<Result<Sample, FrameError>> {
        let text = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(parse_csv(trimmed))
    }
}

impl SampleDecoder for CsvDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Sample, FrameError>> {
        let mut results = Vec::new();
        for &b in bytes {
            if b == CSV_LINE_TERMINATOR {
                results.extend(self.finish_line());
                continue;
            }
            self.line.push(b);
            if self.line.len() > CSV_MAX_LINE_LEN {
                self.line.clear();
                results.push(Err(FrameError::MalformedLine(format!(
                    "line exceeds {} bytes",
                    CSV_MAX_LINE_LEN
                ))));
            }
        }
        results
    }
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one CSV sample line (already trimmed)
pub fn parse_csv(line: &str) -> Result<Sample, FrameError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != CSV_FIELD_COUNT {
        return Err(FrameError::MalformedLine(format!(
            "expected {} fields, got {}",
            CSV_FIELD_COUNT,
            fields.len()
        )));
    }

    let float = |s: &str| {
        s.parse::<f32>()
            .map_err(|_| FrameError::MalformedLine(format!("invalid number: {:?}", s)))
    };

    Ok(Sample::with_pedals(
        float(fields[0])?,
        float(fields[1])?,
        float(fields[2])?,
        parse_brake(fields[3])?,
    ))
}

fn parse_brake(s: &str) -> Result<bool, FrameError> {
    match s {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" => Ok(false),
        other => other
            .parse::<f32>()
            .map(|v| v != 0.0)
            .map_err(|_| FrameError::MalformedLine(format!("invalid brake value: {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::START_BYTE;
    use crate::protocol::packet::encode_sample_frame;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_frame() {
        let mut decoder = FrameDecoder::new();
        let results = decoder.feed(&encode_sample_frame(0.1, 0.2));
        assert_eq!(results.len(), 1);
        let sample = results[0].as_ref().unwrap();
        assert_relative_eq!(sample.delta, 0.1);
        assert_relative_eq!(sample.deltad, 0.2);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_leading_garbage_resync() {
        let mut stream = b"xx".to_vec();
        stream.extend_from_slice(&encode_sample_frame(1.57, 0.0));

        let results = FrameDecoder::new().feed(&stream);
        assert_eq!(results.len(), 1);
        let sample = results[0].as_ref().unwrap();
        assert_relative_eq!(sample.delta, 1.57);
        assert_eq!(sample.deltad, 0.0);
        assert_eq!(sample.cadence, 0.0);
        assert!(!sample.brake);
    }

    #[test]
    fn test_end_byte_inside_payload() {
        // 0x65 in every payload byte position
        let delta = f32::from_le_bytes([0x65, 0x65, 0x65, 0x3F]);
        let deltad = f32::from_le_bytes([0x65, 0x00, 0x65, 0x40]);
        let results = FrameDecoder::new().feed(&encode_sample_frame(delta, deltad));

        assert_eq!(results.len(), 1);
        let sample = results[0].as_ref().unwrap();
        assert_eq!(sample.delta.to_bits(), delta.to_bits());
        assert_eq!(sample.deltad.to_bits(), deltad.to_bits());
    }

    #[test]
    fn test_bad_start_reported_then_recovers() {
        let mut stream = vec![b'q'; 9];
        stream.push(END_BYTE);
        stream.extend_from_slice(&encode_sample_frame(2.0, 3.0));

        let results = FrameDecoder::new().feed(&stream);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Err(FrameError::BadStart { found: b'q' }));
        assert_relative_eq!(results[1].as_ref().unwrap().delta, 2.0);
    }

    #[test]
    fn test_frame_split_across_reads() {
        let frame = encode_sample_frame(-1.0, 4.0);
        let mut decoder = FrameDecoder::new();

        assert!(decoder.feed(&frame[..3]).is_empty());
        assert!(decoder.feed(&frame[3..7]).is_empty());
        let results = decoder.feed(&frame[7..]);
        assert_eq!(results.len(), 1);
        assert_relative_eq!(results[0].as_ref().unwrap().deltad, 4.0);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut stream = Vec::new();
        for i in 0..5 {
            stream.extend_from_slice(&encode_sample_frame(i as f32 * 0.25, 1.0));
        }
        let results = FrameDecoder::new().feed(&stream);
        assert_eq!(results.len(), 5);
        for (i, r) in results.iter().enumerate() {
            assert_relative_eq!(r.as_ref().unwrap().delta, i as f32 * 0.25);
        }
    }

    #[test]
    fn test_long_garbage_is_bounded() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(&[0xAA; 10_000]).is_empty());
        assert!(decoder.pending() <= MAX_ACCUMULATED);

        let results = decoder.feed(&encode_sample_frame(0.75, 0.0));
        assert_eq!(results.len(), 1);
        assert_relative_eq!(results[0].as_ref().unwrap().delta, 0.75);
    }

    #[test]
    fn test_early_end_is_payload_data() {
        // END right after START is kept as data, not treated as a terminator
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(&[START_BYTE, END_BYTE]).is_empty());
        assert_eq!(decoder.pending(), 2);
    }

    #[test]
    fn test_csv_lines() {
        let mut decoder = CsvDecoder::new();
        let results = decoder.feed(b"0.5,1.5,60.0,1\n-0.5,0,0,0\n");
        assert_eq!(results.len(), 2);

        let first = results[0].as_ref().unwrap();
        assert_relative_eq!(first.delta, 0.5);
        assert_relative_eq!(first.cadence, 60.0);
        assert!(first.brake);
        assert!(!results[1].as_ref().unwrap().brake);
    }

    #[test]
    fn test_csv_partial_line_waits() {
        let mut decoder = CsvDecoder::new();
        assert!(decoder.feed(b"0.1,0.2,").is_empty());
        let results = decoder.feed(b"3,0\r\n");
        assert_eq!(results.len(), 1);
        assert_relative_eq!(results[0].as_ref().unwrap().cadence, 3.0);
    }

    #[test]
    fn test_csv_rejects_wrong_field_count() {
        let results = CsvDecoder::new().feed(b"1,2,3\n\n");
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(FrameError::MalformedLine(_))));
    }

    #[test]
    fn test_csv_brake_values() {
        for (field, pressed) in [
            ("0", false),
            ("0.0", false),
            ("False", false),
            ("1", true),
            ("true", true),
            ("2", true),
        ] {
            let sample = parse_csv(&format!("0,0,0,{}", field)).unwrap();
            assert_eq!(sample.brake, pressed, "brake field {:?}", field);
        }
    }

    #[test]
    fn test_csv_rejects_bad_number() {
        assert!(parse_csv("a,1,2,0").is_err());
        assert!(parse_csv("1,1,2,maybe").is_err());
    }
}
