//! Error types for the torque bridge

use crate::protocol::FrameError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation attempted on a serial channel that has been closed
    #[error("Serial channel closed")]
    SerialClosed,

    /// Sample frame could not be decoded
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Inbound command datagram could not be interpreted
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error (XML documents, log records)
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Worker thread panicked
    #[error("Thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
