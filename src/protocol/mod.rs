//! Serial protocol spoken by the steering device
//!
//! Two framings are supported:
//! - **binary** (default): `'s' | payload | 'e'` frames with little-endian floats
//! - **csv**: newline-terminated text lines, used by older firmware

pub mod constants;
pub mod decoder;
pub mod packet;

pub use decoder::{CsvDecoder, FrameDecoder, SampleDecoder};
pub use packet::{decode_sample, encode_sample_frame, encode_torque};

use serde::{Deserialize, Serialize};

/// Per-frame decode failure. Never fatal to the decoder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// Candidate frame did not begin with the start marker
    #[error("bad start byte 0x{found:02X}")]
    BadStart { found: u8 },

    /// Payload was not the expected number of bytes
    #[error("bad payload length: expected {expected}, got {actual}")]
    BadLength { expected: usize, actual: usize },

    /// CSV line could not be parsed
    #[error("malformed line: {0}")]
    MalformedLine(String),
}

/// Framing used on the serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireProtocol {
    #[default]
    Binary,
    Csv,
}

impl WireProtocol {
    /// Fresh decoder for device → host traffic
    pub fn decoder(self) -> Box<dyn SampleDecoder> {
        match self {
            WireProtocol::Binary => Box::new(FrameDecoder::new()),
            WireProtocol::Csv => Box::new(CsvDecoder::new()),
        }
    }

    /// Encode a host → device torque command
    pub fn encode_torque(self, torque: f32) -> Vec<u8> {
        match self {
            WireProtocol::Binary => packet::encode_torque(torque).to_vec(),
            WireProtocol::Csv => packet::encode_torque_line(torque),
        }
    }
}

impl std::str::FromStr for WireProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(WireProtocol::Binary),
            "csv" => Ok(WireProtocol::Csv),
            other => Err(format!("unknown protocol '{}' (expected binary or csv)", other)),
        }
    }
}
