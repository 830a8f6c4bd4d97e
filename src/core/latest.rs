//! Single-slot "most recent value" cell for telemetry display.
//!
//! Holds at most one item. A publisher first removes any stale unread item,
//! then inserts the latest one; if another publisher raced in between, the
//! newer insert is dropped. The reader takes the item with a bounded wait.
//! Used only for human-readable status output.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::time::Duration;

/// Most-recent-value cell shared between a producer task and the status loop
#[derive(Debug)]
pub struct LatestCell<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> LatestCell<T> {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Replace any unread value with `value`
    pub fn publish(&self, value: T) {
        let _ = self.rx.try_recv();
        let _ = self.tx.try_send(value);
    }

    /// Take the current value, waiting at most `timeout` for one to arrive
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Take the current value without waiting
    pub fn try_take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Clone for LatestCell<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for LatestCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_overwrites_stale_value() {
        let cell = LatestCell::new();
        cell.publish(1);
        cell.publish(2);
        cell.publish(3);
        assert_eq!(cell.try_take(), Some(3));
        assert_eq!(cell.try_take(), None);
    }

    #[test]
    fn test_take_timeout_empty() {
        let cell: LatestCell<u8> = LatestCell::new();
        assert_eq!(cell.take_timeout(Duration::from_millis(5)), None);
    }

    #[test]
    fn test_clone_shares_slot() {
        let writer = LatestCell::new();
        let reader = writer.clone();
        writer.publish("latest");
        assert_eq!(reader.take_timeout(Duration::from_millis(5)), Some("latest"));
    }
}
