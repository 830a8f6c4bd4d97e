//! Sensor publisher: serial samples → UDP telemetry + data log
//!
//! Drains the serial channel through the configured decoder. Each decoded
//! sample is queued for the data log, sent as one XML datagram to the
//! control loop and published to the status cell.
//!
//! # Termination
//!
//! There is no stop flag. The loop ends when the serial channel reports
//! that it has been closed, which the supervisor does as part of shutdown.
//!
//! # Error Handling
//!
//! - Frame errors: logged, sample dropped, decoding continues
//! - UDP send errors: logged, not fatal (the peer may not be listening yet)
//! - Other read errors: logged, loop continues after a short pause

use crate::core::latest::LatestCell;
use crate::core::types::{LogRecord, Sample, SessionClock};
use crate::error::Error;
use crate::protocol::SampleDecoder;
use crate::streaming::xml::{TextEncoding, encode_sample};
use crate::transport::Transport;
use crossbeam_channel::Sender;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause after a read that returned nothing
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Pause after an unexpected read error
const ERROR_SLEEP: Duration = Duration::from_millis(10);

/// Counters reported when the publisher exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub samples: u64,
    pub frame_errors: u64,
    pub send_errors: u64,
}

/// Sensor ingestion task
pub struct SensorPublisher {
    transport: Arc<dyn Transport>,
    decoder: Box<dyn SampleDecoder>,
    socket: UdpSocket,
    peer: SocketAddr,
    encoding: TextEncoding,
    log_tx: Sender<LogRecord>,
    latest: LatestCell<Sample>,
    clock: SessionClock,
    stats: PublisherStats,
}

impl SensorPublisher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn Transport>,
        decoder: Box<dyn SampleDecoder>,
        socket: UdpSocket,
        peer: SocketAddr,
        encoding: TextEncoding,
        log_tx: Sender<LogRecord>,
        latest: LatestCell<Sample>,
        clock: SessionClock,
    ) -> Self {
        Self {
            transport,
            decoder,
            socket,
            peer,
            encoding,
            log_tx,
            latest,
            clock,
            stats: PublisherStats::default(),
        }
    }

    /// Run until the serial channel is closed
    pub fn run(mut self) -> PublisherStats {
        log::info!("Sensor publisher started (telemetry -> {})", self.peer);

        while self.transport.is_open() {
            let bytes = match self.transport.read_available() {
                Ok(bytes) => bytes,
                Err(Error::SerialClosed) => break,
                Err(e) => {
                    log::error!("Serial read error: {}", e);
                    thread::sleep(ERROR_SLEEP);
                    continue;
                }
            };

            if bytes.is_empty() {
                thread::sleep(IDLE_SLEEP);
                continue;
            }

            for result in self.decoder.feed(&bytes) {
                match result {
                    Ok(sample) => self.publish(sample),
                    Err(e) => {
                        self.stats.frame_errors += 1;
                        log::warn!("Discarding frame: {}", e);
                    }
                }
            }
        }

        log::info!(
            "Sensor publisher stopped ({} samples, {} frame errors)",
            self.stats.samples,
            self.stats.frame_errors
        );
        self.stats
    }

    fn publish(&mut self, sample: Sample) {
        self.stats.samples += 1;

        if self
            .log_tx
            .send(LogRecord::sample(self.clock.elapsed(), sample))
            .is_err()
        {
            log::trace!("Data log closed, sample not recorded");
        }

        match encode_sample(&sample, self.encoding) {
            Ok(doc) => {
                if let Err(e) = self.socket.send_to(&doc, self.peer) {
                    self.stats.send_errors += 1;
                    log::warn!("Failed to send telemetry to {}: {}", self.peer, e);
                } else {
                    log::trace!(
                        "Sent sample delta={:.4} deltad={:.4} to {}",
                        sample.delta,
                        sample.deltad,
                        self.peer
                    );
                }
            }
            Err(e) => log::error!("Failed to encode sample: {}", e),
        }

        self.latest.publish(sample);
    }
}
