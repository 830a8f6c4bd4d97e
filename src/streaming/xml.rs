//! XML documents exchanged with the control loop
//!
//! Outbound telemetry (one document per sample):
//!
//! ```text
//! <?xml version='1.0' encoding='utf-8'?>
//! <root><delta>0.1</delta><deltad>0</deltad><cadence>0</cadence><brake>false</brake></root>
//! ```
//!
//! Inbound commands carry an optional `torque` child whose text is a
//! decimal number (`nan` allowed). A document without `torque` is valid and
//! simply carries no command.

use crate::core::types::Sample;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Text encodings accepted for outbound documents.
///
/// Every emitted character is ASCII, so the bytes are the same for all of
/// them; only the declaration differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
}

impl TextEncoding {
    /// Parse an encoding label (case-insensitive, common aliases)
    pub fn from_label(label: &str) -> Result<Self> {
        match label.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "us-ascii" | "ascii" => Ok(TextEncoding::Ascii),
            "iso-8859-1" | "latin-1" | "latin1" => Ok(TextEncoding::Latin1),
            other => Err(Error::Config(format!("unsupported encoding '{}'", other))),
        }
    }

    /// Label written into the XML declaration
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "us-ascii",
            TextEncoding::Latin1 => "iso-8859-1",
        }
    }
}

/// Telemetry document for one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename = "root")]
pub struct SampleDocument {
    pub delta: f32,
    pub deltad: f32,
    pub cadence: f32,
    pub brake: bool,
}

impl From<&Sample> for SampleDocument {
    fn from(s: &Sample) -> Self {
        Self {
            delta: s.delta,
            deltad: s.deltad,
            cadence: s.cadence,
            brake: s.brake,
        }
    }
}

/// Inbound command document; every other element is ignored
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename = "root")]
pub struct CommandDocument {
    /// Every `torque` element in document order; only the first is used
    #[serde(default)]
    pub torque: Vec<String>,
}

/// Serialize a sample as a complete XML document
pub fn encode_sample(sample: &Sample, encoding: TextEncoding) -> Result<Vec<u8>> {
    let body = quick_xml::se::to_string(&SampleDocument::from(sample))
        .map_err(|e| Error::Serialization(e.to_string()))?;

    let mut doc = format!("<?xml version='1.0' encoding='{}'?>\n", encoding.label());
    doc.push_str(&body);
    Ok(doc.into_bytes())
}

/// Parse an inbound datagram.
///
/// Returns `Ok(None)` when the document has no `torque` element. When there
/// are several, the first one wins. Malformed XML and non-numeric torque
/// text are errors.
pub fn decode_command(datagram: &[u8]) -> Result<Option<f64>> {
    let text = std::str::from_utf8(datagram)
        .map_err(|e| Error::MalformedCommand(format!("not valid UTF-8: {}", e)))?;

    let doc: CommandDocument = quick_xml::de::from_str(text.trim())
        .map_err(|e| Error::MalformedCommand(e.to_string()))?;

    let Some(torque) = doc.torque.into_iter().next() else {
        return Ok(None);
    };
    let value = torque
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::MalformedCommand(format!("invalid torque value: {:?}", torque)))?;
    Ok(Some(value))
}
