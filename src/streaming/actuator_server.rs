//! Actuator server: UDP torque commands → serial writes
//!
//! Single-threaded: datagrams are handled one at a time in arrival order,
//! so a slow serial write delays the next command.
//!
//! # Per-datagram Handling
//!
//! ```text
//! 1. Parse XML; no <torque> element → ignored (no write, no log entry)
//! 2. Log the raw commanded value, even if it is later suppressed
//! 3. Scale + saturate; NaN → suppressed (no write)
//! 4. Encode and write to serial; remember value for status display
//! ```
//!
//! Malformed datagrams and failed writes are logged and dropped; the
//! server keeps serving.

use crate::control::TorqueLimits;
use crate::core::latest::LatestCell;
use crate::core::types::{LogRecord, SessionClock};
use crate::error::Result;
use crate::protocol::WireProtocol;
use crate::streaming::xml::decode_command;
use crate::transport::Transport;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Receive timeout so the serve loop notices a stop request
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum UDP datagram size
const MAX_DATAGRAM_SIZE: usize = 65536;

/// What happened to one inbound datagram
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    /// Document had no torque element
    Ignored,
    /// Torque computed to NaN; nothing written
    Suppressed { raw: f64 },
    /// Limited torque written to the device
    Written { raw: f64, torque: f32 },
}

/// Counters reported when the server exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub datagrams: u64,
    pub written: u64,
    pub suppressed: u64,
    pub ignored: u64,
    pub dropped: u64,
}

/// Turns one command datagram into at most one serial write
pub struct CommandHandler {
    transport: Arc<dyn Transport>,
    protocol: WireProtocol,
    limits: TorqueLimits,
    log_tx: Sender<LogRecord>,
    latest: LatestCell<f32>,
    clock: SessionClock,
}

impl CommandHandler {
    pub fn new(
        transport: Arc<dyn Transport>,
        protocol: WireProtocol,
        limits: TorqueLimits,
        log_tx: Sender<LogRecord>,
        latest: LatestCell<f32>,
        clock: SessionClock,
    ) -> Self {
        Self {
            transport,
            protocol,
            limits,
            log_tx,
            latest,
            clock,
        }
    }

    /// Handle one datagram
    pub fn handle(&self, datagram: &[u8]) -> Result<CommandOutcome> {
        let Some(raw) = decode_command(datagram)? else {
            return Ok(CommandOutcome::Ignored);
        };

        if self
            .log_tx
            .send(LogRecord::torque(self.clock.elapsed(), raw as f32))
            .is_err()
        {
            log::trace!("Data log closed, command not recorded");
        }

        let Some(torque) = self.limits.apply(raw) else {
            log::debug!("Suppressing NaN torque command");
            return Ok(CommandOutcome::Suppressed { raw });
        };

        self.transport.write(&self.protocol.encode_torque(torque))?;
        self.latest.publish(torque);
        log::trace!("Torque command written: raw={} limited={}", raw, torque);
        Ok(CommandOutcome::Written { raw, torque })
    }
}

/// Stops a running server and waits for its serve loop to finish
#[derive(Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    done_rx: Receiver<()>,
}

impl ShutdownHandle {
    /// Request stop and block until no further command can be handled
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
        // Returns once the serve loop drops its end of the channel
        let _ = self.done_rx.recv();
    }
}

/// UDP command server bound to the inbound address
pub struct ActuatorServer {
    socket: UdpSocket,
    handler: CommandHandler,
    running: Arc<AtomicBool>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl ActuatorServer {
    /// Bind the command socket
    pub fn bind<A: ToSocketAddrs>(addr: A, handler: CommandHandler) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        log::info!("Actuator server bound to {}", socket.local_addr()?);

        let (done_tx, done_rx) = bounded(0);
        Ok(Self {
            socket,
            handler,
            running: Arc::new(AtomicBool::new(true)),
            done_tx,
            done_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
            done_rx: self.done_rx.clone(),
        }
    }

    /// Serve until a shutdown is requested
    pub fn serve(self) -> ServerStats {
        log::info!("Actuator server started");

        let Self {
            socket,
            handler,
            running,
            done_tx,
            ..
        } = self;
        let mut stats = ServerStats::default();
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        while running.load(Ordering::Relaxed) {
            let (len, src) = match socket.recv_from(&mut buffer) {
                Ok(result) => result,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    log::error!("UDP recv error: {}", e);
                    continue;
                }
            };

            stats.datagrams += 1;
            match handler.handle(&buffer[..len]) {
                Ok(CommandOutcome::Written { .. }) => stats.written += 1,
                Ok(CommandOutcome::Suppressed { .. }) => stats.suppressed += 1,
                Ok(CommandOutcome::Ignored) => stats.ignored += 1,
                Err(e) => {
                    stats.dropped += 1;
                    log::warn!("Dropping command from {}: {}", src, e);
                }
            }
        }

        drop(done_tx);
        log::info!(
            "Actuator server stopped ({} written, {} suppressed, {} dropped)",
            stats.written,
            stats.suppressed,
            stats.dropped
        );
        stats
    }
}
