//! Configuration for the torque bridge
//!
//! Loaded from an optional TOML file, then overridden by command-line
//! flags. The resulting [`BridgeConfig`] is immutable once the bridge starts.

use crate::error::{Error, Result};
use crate::protocol::WireProtocol;
use crate::protocol::constants::{DEFAULT_TORQUE_SCALE, MAX_TORQUE_PEAK};
use crate::streaming::xml::TextEncoding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BAUDRATE: u32 = 115200;
pub const DEFAULT_ENCODING: &str = "utf-8";
pub const DEFAULT_UDP_HOST: &str = "localhost";
pub const DEFAULT_UDP_TX_PORT: u16 = 9900;
pub const DEFAULT_UDP_RX_PORT: u16 = 9901;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 50;

/// Top-level bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial link to the device
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device path (e.g. "/dev/ttyACM0"); must be given
    pub port: String,
    pub baud_rate: u32,
    /// Upper bound on a single torque command write
    pub write_timeout_ms: u64,
    /// Framing used by the device firmware
    pub protocol: WireProtocol,
}

/// UDP endpoints of the control loop
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Remote host for telemetry, also the bind host for commands
    pub host: String,
    /// Port telemetry datagrams are sent to
    pub tx_port: u16,
    /// Port torque command datagrams are received on
    pub rx_port: u16,
    /// Text encoding label for outbound XML documents
    pub encoding: String,
}

/// Torque command shaping
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Factor applied to inbound torque before saturation
    pub torque_scale: f64,
    /// Peak torque magnitude (N·m)
    pub torque_limit: f64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory the session data log is written to
    pub directory: PathBuf,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUDRATE,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            protocol: WireProtocol::Binary,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_UDP_HOST.to_string(),
            tx_port: DEFAULT_UDP_TX_PORT,
            rx_port: DEFAULT_UDP_RX_PORT,
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            torque_scale: DEFAULT_TORQUE_SCALE,
            torque_limit: MAX_TORQUE_PEAK,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: PathBuf::from("."),
        }
    }
}

impl SerialConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl NetworkConfig {
    /// Telemetry destination as "host:port"
    pub fn tx_address(&self) -> String {
        format!("{}:{}", self.host, self.tx_port)
    }

    /// Command bind address as "host:port"
    pub fn rx_address(&self) -> String {
        format!("{}:{}", self.host, self.rx_port)
    }

    /// Parsed outbound text encoding
    pub fn text_encoding(&self) -> Result<TextEncoding> {
        TextEncoding::from_label(&self.encoding)
    }
}

/// Values given explicitly on the command line; `None` keeps the file/default value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub encoding: Option<String>,
    pub udp_host: Option<String>,
    pub udp_tx_port: Option<u16>,
    pub udp_rx_port: Option<u16>,
    pub torque_scale: Option<f64>,
    pub torque_limit: Option<f64>,
    pub protocol: Option<WireProtocol>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl BridgeConfig {
    /// Load configuration from TOML file
    ///
    /// Missing sections and keys fall back to their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Apply command-line overrides on top of this configuration
    pub fn with_overrides(mut self, o: ConfigOverrides) -> Self {
        if let Some(v) = o.port {
            self.serial.port = v;
        }
        if let Some(v) = o.baud_rate {
            self.serial.baud_rate = v;
        }
        if let Some(v) = o.protocol {
            self.serial.protocol = v;
        }
        if let Some(v) = o.encoding {
            self.network.encoding = v;
        }
        if let Some(v) = o.udp_host {
            self.network.host = v;
        }
        if let Some(v) = o.udp_tx_port {
            self.network.tx_port = v;
        }
        if let Some(v) = o.udp_rx_port {
            self.network.rx_port = v;
        }
        if let Some(v) = o.torque_scale {
            self.control.torque_scale = v;
        }
        if let Some(v) = o.torque_limit {
            self.control.torque_limit = v;
        }
        if let Some(v) = o.log_dir {
            self.logging.directory = v;
        }
        if let Some(v) = o.log_level {
            self.logging.level = v;
        }
        self
    }

    /// Check values the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            return Err(Error::Config("serial port not set".to_string()));
        }
        if self.serial.baud_rate == 0 {
            return Err(Error::Config("baud rate must be positive".to_string()));
        }
        if !self.control.torque_scale.is_finite() {
            return Err(Error::Config(format!(
                "torque scale must be finite, got {}",
                self.control.torque_scale
            )));
        }
        let peak = self.control.torque_limit;
        if !peak.is_finite() || peak <= 0.0 {
            return Err(Error::Config(format!(
                "torque limit must be positive and finite, got {}",
                peak
            )));
        }
        self.network.text_encoding()?;
        Ok(())
    }
}
