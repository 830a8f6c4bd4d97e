//! Mock transport for testing without a device

use super::{Transport, check_write};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// In-memory serial channel.
///
/// Clones share state, so a test keeps one handle to inject device bytes
/// and inspect writes while the bridge owns another.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    write_failures: VecDeque<io::Error>,
    open: bool,
    writes_after_close: usize,
}

impl MockTransport {
    /// Create a new, open mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                read_buffer: VecDeque::new(),
                writes: Vec::new(),
                write_failures: VecDeque::new(),
                open: true,
                writes_after_close: 0,
            })),
        }
    }

    /// Inject bytes as if sent by the device
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Every successful write, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.lock().writes.clone()
    }

    /// Most recent successful write
    pub fn last_write(&self) -> Option<Vec<u8>> {
        self.inner.lock().writes.last().cloned()
    }

    /// Make the next write fail with `error` (queued, one per write)
    pub fn fail_next_write(&self, error: io::Error) {
        self.inner.lock().write_failures.push_back(error);
    }

    /// Writes attempted after the channel was closed
    pub fn writes_after_close(&self) -> usize {
        self.inner.lock().writes_after_close
    }
}

impl Transport for MockTransport {
    fn bytes_available(&self) -> Result<usize> {
        let inner = self.inner.lock();
        if !inner.open {
            return Err(Error::SerialClosed);
        }
        Ok(inner.read_buffer.len())
    }

    fn read_available(&self) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(Error::SerialClosed);
        }
        Ok(inner.read_buffer.drain(..).collect())
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.open {
            inner.writes_after_close += 1;
            return Err(Error::SerialClosed);
        }
        if let Some(e) = inner.write_failures.pop_front() {
            // A swallowed benign error still counts as a completed write
            check_write(Err(e))?;
        }
        inner.writes.push(data.to_vec());
        Ok(())
    }

    fn close(&self) {
        self.inner.lock().open = false;
    }

    fn is_open(&self) -> bool {
        self.inner.lock().open
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_drains_injected_bytes() {
        let mock = MockTransport::new();
        mock.inject_read(&[1, 2, 3]);
        assert_eq!(mock.bytes_available().unwrap(), 3);
        assert_eq!(mock.read_available().unwrap(), vec![1, 2, 3]);
        assert!(mock.read_available().unwrap().is_empty());
    }

    #[test]
    fn test_closed_channel_reports_closed() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        mock.close();
        assert!(!handle.is_open());
        assert!(matches!(handle.read_available(), Err(Error::SerialClosed)));
        assert!(matches!(handle.write(&[0]), Err(Error::SerialClosed)));
        assert_eq!(handle.writes_after_close(), 1);
    }

    #[test]
    fn test_benign_failure_still_records_write() {
        let mock = MockTransport::new();
        mock.fail_next_write(io::Error::from_raw_os_error(0));
        mock.write(b"ok").unwrap();
        assert_eq!(mock.writes(), vec![b"ok".to_vec()]);
    }

    #[test]
    fn test_real_failure_drops_write() {
        let mock = MockTransport::new();
        mock.fail_next_write(io::Error::new(io::ErrorKind::TimedOut, "timeout"));
        assert!(mock.write(b"lost").is_err());
        assert!(mock.writes().is_empty());
    }
}
