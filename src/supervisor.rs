//! Bridge lifecycle
//!
//! # Startup
//!
//! ```text
//! serial channel → outbound UDP socket → command socket
//!   → session log file (LogSink) → SensorPublisher, ActuatorServer → status loop
//! ```
//!
//! A failure after the log file exists zeroes the actuator and closes the
//! channel before the error is returned. Signal handling is installed by
//! the caller before startup (see [`install_signal_handler`]).
//!
//! # Shutdown
//!
//! Strict order, so the actuator is never left holding a nonzero torque:
//!
//! 1. Signal the log sink to stop (it drains what is already queued)
//! 2. Stop the actuator server and wait until it can no longer write
//! 3. Write a zero torque command to the serial channel
//! 4. Close the serial channel, which ends the sensor publisher
//! 5. Join log sink, sensor publisher, actuator server

use crate::config::BridgeConfig;
use crate::control::TorqueLimits;
use crate::core::latest::LatestCell;
use crate::core::types::{Sample, SessionClock};
use crate::error::{Error, Result};
use crate::protocol::WireProtocol;
use crate::protocol::constants::RAD_PER_DEG;
use crate::recorder::{LogSink, LogSinkHandle};
use crate::streaming::{
    ActuatorServer, CommandHandler, PublisherStats, SensorPublisher, ServerStats, ShutdownHandle,
};
use crate::transport::Transport;
use crossbeam_channel::unbounded;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Period of the status loop
pub const STATUS_PERIOD: Duration = Duration::from_millis(100);

/// Maximum wait for each status cell per period
pub const STATUS_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Counts gathered during an orderly shutdown
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    /// Records written to the session log
    pub records_logged: u64,
    /// Samples published as telemetry
    pub samples_published: u64,
    /// Torque commands written to the device
    pub commands_written: u64,
    /// Whether the final zero torque command reached the device
    pub zero_torque_sent: bool,
    pub log_path: PathBuf,
}

/// A running bridge
pub struct Bridge {
    transport: Arc<dyn Transport>,
    protocol: WireProtocol,
    clock: SessionClock,
    latest_sample: LatestCell<Sample>,
    latest_torque: LatestCell<f32>,
    command_addr: SocketAddr,
    log_sink: LogSinkHandle,
    server_stop: ShutdownHandle,
    publisher: JoinHandle<PublisherStats>,
    server: JoinHandle<ServerStats>,
}

impl Bridge {
    /// Start every task over an already opened serial channel
    pub fn start(config: &BridgeConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let encoding = config.network.text_encoding()?;
        let protocol = config.serial.protocol;
        let clock = SessionClock::start();

        let peer = resolve(&config.network.tx_address())?;
        let telemetry_socket = UdpSocket::bind(unspecified_for(&peer))?;

        let (log_tx, log_rx) = unbounded();
        let latest_sample = LatestCell::new();
        let latest_torque = LatestCell::new();

        let limits = TorqueLimits::from_config(&config.control);
        let handler = CommandHandler::new(
            Arc::clone(&transport),
            protocol,
            limits,
            log_tx.clone(),
            latest_torque.clone(),
            clock,
        );
        let server = ActuatorServer::bind(config.network.rx_address(), handler)?;
        let command_addr = server.local_addr()?;
        let server_stop = server.shutdown_handle();

        let publisher = SensorPublisher::new(
            Arc::clone(&transport),
            protocol.decoder(),
            telemetry_socket,
            peer,
            encoding,
            log_tx,
            latest_sample.clone(),
            clock,
        );

        // The log file must exist before anything can write to the device
        let log_sink = LogSink::spawn(&config.logging.directory, log_rx)?;

        let publisher = match thread::Builder::new()
            .name("sensor-publisher".to_string())
            .spawn(move || publisher.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                abort_start(&*transport, protocol, log_sink, None);
                return Err(Error::Other(format!(
                    "Failed to spawn sensor publisher: {}",
                    e
                )));
            }
        };
        let server = match thread::Builder::new()
            .name("actuator-server".to_string())
            .spawn(move || server.serve())
        {
            Ok(handle) => handle,
            Err(e) => {
                abort_start(&*transport, protocol, log_sink, Some(publisher));
                return Err(Error::Other(format!(
                    "Failed to spawn actuator server: {}",
                    e
                )));
            }
        };

        log::info!(
            "Using serial port {} at {} baud ({:?} protocol)",
            config.serial.port,
            config.serial.baud_rate,
            protocol
        );
        log::info!(
            "Torque limit {} N·m peak ({} N·m continuous rating), scale {}",
            limits.peak,
            limits.continuous,
            limits.scale
        );
        log::info!("Transmitting UDP telemetry to {}", peer);
        log::info!("Receiving UDP commands on {}", command_addr);

        Ok(Self {
            transport,
            protocol,
            clock,
            latest_sample,
            latest_torque,
            command_addr,
            log_sink,
            server_stop,
            publisher,
            server,
        })
    }

    /// Address the actuator server is bound to
    pub fn command_addr(&self) -> SocketAddr {
        self.command_addr
    }

    pub fn log_path(&self) -> &Path {
        self.log_sink.path()
    }

    /// One status line from the most recent torque and sample, if any
    pub fn status_line(&self) -> String {
        let torque = self.latest_torque.take_timeout(STATUS_READ_TIMEOUT);
        let sample = self.latest_sample.take_timeout(STATUS_READ_TIMEOUT);
        format_status(self.clock.elapsed(), torque, sample)
    }

    /// Print status lines until `stop` is set
    pub fn run_until(&self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(STATUS_PERIOD);
            println!("{}", self.status_line());
        }
    }

    /// Stop every task in the safe order and wait for them
    pub fn shutdown(self) -> Result<ShutdownReport> {
        log::info!("Shutting down...");

        self.log_sink.stop();
        self.server_stop.shutdown();

        let zero_torque_sent = match self.transport.write(&self.protocol.encode_torque(0.0)) {
            Ok(()) => {
                log::info!("Zero torque command sent");
                true
            }
            Err(e) => {
                log::error!("Failed to send zero torque command: {}", e);
                false
            }
        };
        self.transport.close();

        let log_path = self.log_sink.path().to_path_buf();
        let logged = self.log_sink.join();
        let published = self.publisher.join().map_err(|_| Error::ThreadPanic);
        let served = self.server.join().map_err(|_| Error::ThreadPanic);

        let report = ShutdownReport {
            records_logged: logged?,
            samples_published: published?.samples,
            commands_written: served?.written,
            zero_torque_sent,
            log_path,
        };
        log::info!(
            "Bridge stopped: {} samples published, {} commands written, {} records logged",
            report.samples_published,
            report.commands_written,
            report.records_logged
        );
        Ok(report)
    }
}

/// Register SIGINT/SIGTERM; the returned flag is set once either arrives.
///
/// Call before [`Bridge::start`] so a signal during startup still leads to
/// an orderly shutdown instead of the default termination.
pub fn install_signal_handler() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let flag = Arc::clone(&stop);
    thread::Builder::new()
        .name("signal-handler".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                log::info!("Received signal {}, initiating shutdown...", sig);
                flag.store(true, Ordering::Relaxed);
            }
        })
        .map_err(|e| Error::Other(format!("Failed to spawn signal handler: {}", e)))?;
    Ok(stop)
}

/// Undo a partial start: zero the actuator, close the channel, join tasks
fn abort_start(
    transport: &dyn Transport,
    protocol: WireProtocol,
    log_sink: LogSinkHandle,
    publisher: Option<JoinHandle<PublisherStats>>,
) {
    log_sink.stop();
    if let Err(e) = transport.write(&protocol.encode_torque(0.0)) {
        log::error!("Failed to send zero torque command: {}", e);
    }
    transport.close();
    if let Err(e) = log_sink.join() {
        log::error!("Log sink failed: {}", e);
    }
    if let Some(publisher) = publisher
        && publisher.join().is_err()
    {
        log::error!("Sensor publisher panicked");
    }
}

/// Format one status line: elapsed, torque, then the sample (angles in degrees)
pub fn format_status(elapsed: f64, torque: Option<f32>, sample: Option<Sample>) -> String {
    let mut fields = vec![format!("{:8.4}", elapsed)];
    fields.push(match torque {
        Some(t) => format!("{:.6}", t),
        None => "-".to_string(),
    });
    if let Some(s) = sample {
        fields.push(format!("{:8.4}", s.delta / RAD_PER_DEG));
        fields.push(format!("{:8.4}", s.deltad / RAD_PER_DEG));
        fields.push(format!("{:8.4}", s.cadence));
        fields.push(s.brake.to_string());
    }
    fields.join("\t")
}

/// First resolved address, preferring IPv4
fn resolve(address: &str) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = address.to_socket_addrs()?.collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| Error::Config(format!("could not resolve {}", address)))
}

/// Wildcard bind address in the same family as `peer`
fn unspecified_for(peer: &SocketAddr) -> &'static str {
    match peer {
        SocketAddr::V4(_) => "0.0.0.0:0",
        SocketAddr::V6(_) => "[::]:0",
    }
}
