//! Core abstractions shared by the bridge tasks.
//!
//! - [`types`]: samples and log records
//! - [`latest`]: single-slot most-recent-value cell

pub mod latest;
pub mod types;

pub use latest::LatestCell;
pub use types::{LogPayload, LogRecord, Sample, SessionClock};
