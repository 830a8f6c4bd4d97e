//! torque-bridge daemon
//!
//! Relays sensor samples from the steering device to the control loop over
//! UDP and writes the loop's torque commands back to the device.
//!
//! ```bash
//! torque-bridge /dev/ttyACM0 -b 115200 -H 192.168.1.20 -P 9900 -p 9901
//! torque-bridge -c bridge.toml
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use torque_bridge::config::ConfigOverrides;
use torque_bridge::protocol::WireProtocol;
use torque_bridge::transport::SerialTransport;
use torque_bridge::supervisor::install_signal_handler;
use torque_bridge::{Bridge, BridgeConfig, Result};

#[derive(Parser)]
#[command(name = "torque-bridge")]
#[command(about = "Bridge serial steering sensor data and torque commands over UDP")]
struct Args {
    /// Serial device (e.g. /dev/ttyACM0)
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baudrate: Option<u32>,

    /// Text encoding for outbound XML
    #[arg(short, long)]
    encoding: Option<String>,

    /// UDP host for telemetry and commands
    #[arg(short = 'H', long)]
    udp_host: Option<String>,

    /// UDP port telemetry is sent to
    #[arg(short = 'P', long)]
    udp_txport: Option<u16>,

    /// UDP port torque commands are received on
    #[arg(short = 'p', long)]
    udp_rxport: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Factor applied to commanded torque
    #[arg(long)]
    torque_scale: Option<f64>,

    /// Peak torque magnitude (N·m)
    #[arg(long)]
    torque_limit: Option<f64>,

    /// Serial framing: binary or csv
    #[arg(long)]
    protocol: Option<WireProtocol>,

    /// Directory for the session data log
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port.clone(),
            baud_rate: self.baudrate,
            encoding: self.encoding.clone(),
            udp_host: self.udp_host.clone(),
            udp_tx_port: self.udp_txport,
            udp_rx_port: self.udp_rxport,
            torque_scale: self.torque_scale,
            torque_limit: self.torque_limit,
            protocol: self.protocol,
            log_dir: self.log_dir.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let base = match &args.config {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };
    let config = base.with_overrides(args.overrides());

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("torque-bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        log::info!("Using config: {}", path.display());
    }
    config.validate()?;
    let stop = install_signal_handler()?;

    let transport = SerialTransport::open(
        &config.serial.port,
        config.serial.baud_rate,
        config.serial.write_timeout(),
    )?;

    let bridge = Bridge::start(&config, Arc::new(transport))?;
    bridge.run_until(&stop);
    let report = bridge.shutdown()?;
    if !report.zero_torque_sent {
        log::warn!("Device may still hold the last commanded torque");
    }
    log::info!("Session log written to {}", report.log_path.display());
    Ok(())
}
