//! Serial transport implementation

use super::{Transport, check_write};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Read timeout for a single poll of the device (keeps the reader from spinning)
const READ_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Minimum read buffer when nothing is reported as waiting
const MIN_READ_CHUNK: usize = 64;

/// Serial transport for the device UART.
///
/// Holds two handles to the same port (via `try_clone`), one per
/// direction, each behind its own lock so a blocked read never delays a
/// torque write.
pub struct SerialTransport {
    reader: Mutex<Option<Box<dyn SerialPort>>>,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    open: AtomicBool,
}

impl SerialTransport {
    /// Open a serial port
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Baud rate (e.g., 115200)
    /// * `write_timeout` - Upper bound on a single command write
    pub fn open(path: &str, baud_rate: u32, write_timeout: Duration) -> Result<Self> {
        let reader = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_POLL_TIMEOUT)
            .open()?;

        let mut writer = reader.try_clone()?;
        writer.set_timeout(write_timeout)?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);

        Ok(SerialTransport {
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            open: AtomicBool::new(true),
        })
    }
}

impl Transport for SerialTransport {
    fn bytes_available(&self) -> Result<usize> {
        let guard = self.reader.lock();
        let port = guard.as_ref().ok_or(Error::SerialClosed)?;
        Ok(port.bytes_to_read()? as usize)
    }

    fn read_available(&self) -> Result<Vec<u8>> {
        let mut guard = self.reader.lock();
        let port = guard.as_mut().ok_or(Error::SerialClosed)?;

        let waiting = port.bytes_to_read()? as usize;
        let mut buffer = vec![0u8; waiting.max(MIN_READ_CHUNK)];
        match port.read(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                Ok(buffer)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock();
        let port = guard.as_mut().ok_or(Error::SerialClosed)?;
        check_write(port.write_all(data))
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.writer.lock().take();
            self.reader.lock().take();
            log::info!("Serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
