//! Transport layer for the serial link to the device
//!
//! The bridge reads from one task and writes from another at the same
//! time, so every implementation must allow a read and a write to proceed
//! concurrently through a shared reference. Writes are never issued from
//! two places at once: the actuator server writes during normal operation
//! and the supervisor writes once during shutdown after the server stopped.
//!
//! After [`Transport::close`] every operation returns [`Error::SerialClosed`].

use crate::error::{Error, Result};

pub mod mock;
mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Duplex byte channel to the device
pub trait Transport: Send + Sync {
    /// Number of bytes waiting to be read
    fn bytes_available(&self) -> Result<usize>;

    /// Read whatever is currently available (possibly nothing)
    fn read_available(&self) -> Result<Vec<u8>>;

    /// Write a complete command, bounded by the configured write timeout
    fn write(&self, data: &[u8]) -> Result<()>;

    /// Close the channel; blocked and subsequent calls observe `SerialClosed`
    fn close(&self);

    /// Whether the channel is still open
    fn is_open(&self) -> bool;
}

/// Windows reports some completed serial writes as ERROR_SUCCESS (code 0).
pub fn is_benign_write_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(0)
}

/// Map a write failure, swallowing the benign "completed successfully" error
pub fn check_write(result: std::io::Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if is_benign_write_error(&e) => {
            log::trace!("Ignoring benign serial write error: {}", e);
            Ok(())
        }
        Err(e) => Err(Error::Io(e)),
    }
}
