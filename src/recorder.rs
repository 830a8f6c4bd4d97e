//! Persistent session log
//!
//! One file per bridge run, named after the UTC start time. The file is a
//! sequence of length-prefixed postcard entries:
//!
//! ```text
//! [u32 LE length][postcard LogEntry]  Started(rfc3339)
//! [u32 LE length][postcard LogEntry]  Record(elapsed, payload)  (zero or more)
//! [u32 LE length][postcard LogEntry]  Stopped(rfc3339)
//! ```
//!
//! [`LogSink`] owns the writer on its own thread. Records arrive over an
//! unbounded channel from the sensor and actuator tasks. A stop request
//! drains everything already queued before the closing marker is written.

use crate::core::types::LogRecord;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, bounded, select};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Upper bound on a single encoded entry
const MAX_ENTRY_LEN: usize = 64 * 1024;

/// One entry in a session log file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogEntry {
    /// Wall-clock time the session started (RFC 3339, UTC)
    Started(String),
    Record(LogRecord),
    /// Wall-clock time the session ended (RFC 3339, UTC)
    Stopped(String),
}

/// Log file name for a session started at `start`
pub fn log_file_name(start: DateTime<Utc>) -> String {
    start.format("sensor_data_%y%m%d_%H%M%S.log").to_string()
}

/// Sequential writer for a session log file
pub struct LogWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    records: u64,
}

impl LogWriter {
    /// Create the file and write the opening marker
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = Self {
            writer: BufWriter::new(file),
            path,
            records: 0,
        };
        writer.write_entry(&LogEntry::Started(Utc::now().to_rfc3339()))?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record
    pub fn record(&mut self, record: &LogRecord) -> Result<()> {
        self.write_entry(&LogEntry::Record(*record))?;
        self.records += 1;
        Ok(())
    }

    /// Write the closing marker and flush; returns the record count
    pub fn finish(mut self) -> Result<u64> {
        self.write_entry(&LogEntry::Stopped(Utc::now().to_rfc3339()))?;
        self.writer.flush()?;
        Ok(self.records)
    }

    fn write_entry(&mut self, entry: &LogEntry) -> Result<()> {
        let bytes = postcard::to_allocvec(entry)?;
        let len = bytes.len() as u32;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&bytes)?;
        Ok(())
    }
}

/// Reads a session log back entry by entry
pub struct LogReader {
    reader: BufReader<File>,
}

impl LogReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
        })
    }

    /// Next entry, or `None` at end of file
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_ENTRY_LEN {
            return Err(Error::Serialization(format!(
                "log entry too large: {} bytes",
                len
            )));
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload)?;
        Ok(Some(postcard::from_bytes(&payload)?))
    }

    /// Read every remaining entry
    pub fn read_all(mut self) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Log sink task
pub struct LogSink {
    writer: LogWriter,
    records: Receiver<LogRecord>,
    stop_rx: Receiver<()>,
}

/// Handle to a running [`LogSink`]
pub struct LogSinkHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<Result<u64>>,
    path: PathBuf,
}

impl LogSink {
    /// Create the session file in `directory` and start the writer thread
    pub fn spawn(directory: impl AsRef<Path>, records: Receiver<LogRecord>) -> Result<LogSinkHandle> {
        let path = directory.as_ref().join(log_file_name(Utc::now()));
        let writer = LogWriter::create(&path)?;
        log::info!("Logging session data to {}", path.display());

        let (stop_tx, stop_rx) = bounded(1);
        let sink = LogSink {
            writer,
            records,
            stop_rx,
        };
        let thread = thread::Builder::new()
            .name("log-sink".to_string())
            .spawn(move || sink.run())
            .map_err(|e| Error::Other(format!("Failed to spawn log sink: {}", e)))?;

        Ok(LogSinkHandle {
            stop_tx,
            thread,
            path,
        })
    }

    fn run(mut self) -> Result<u64> {
        loop {
            select! {
                recv(self.records) -> msg => match msg {
                    Ok(record) => self.writer.record(&record)?,
                    // Every producer is gone; nothing more can arrive
                    Err(_) => break,
                },
                recv(self.stop_rx) -> _ => break,
            }
        }

        while let Ok(record) = self.records.try_recv() {
            self.writer.record(&record)?;
        }

        let path = self.writer.path().to_path_buf();
        let count = self.writer.finish()?;
        log::info!("Session log closed: {} records in {}", count, path.display());
        Ok(count)
    }
}

impl LogSinkHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ask the sink to drain its queue and close the file
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    /// Wait for the sink thread; returns the number of records written
    pub fn join(self) -> Result<u64> {
        self.thread.join().map_err(|_| Error::ThreadPanic)?
    }
}
