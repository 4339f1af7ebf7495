//! # Runtime Configuration
//!
//! Settings are read from an optional JSON file. Every field has a default, so
//! an empty object (or no file at all) yields a working setup for a
//! locally attached printer driven through the process bridge.
//!
//! ```json
//! {
//!   "printer_name": "ZDesigner ZD621R-203dpi ZPL",
//!   "template_path": "templates/label.zpl",
//!   "default_transport": "process-bridge",
//!   "pacing_ms": 2000,
//!   "network": { "host": "192.168.1.40" }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::EtiquetaError;
use crate::payload::{self, DEFAULT_TARGET_LENGTH};
use crate::printer::PrinterConfig;
use crate::transport::TransportKind;

/// Raw-print TCP port.
pub const RAW_PRINT_PORT: u16 = 9100;

fn default_printer_name() -> String {
    PrinterConfig::ZD621R.driver_name.to_string()
}

fn default_template_path() -> Option<PathBuf> {
    Some(PathBuf::from("templates/label.zpl"))
}

fn default_target_length() -> usize {
    DEFAULT_TARGET_LENGTH
}

fn default_pacing_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Printer name passed to the interpreter and used by os-copy on Windows.
    #[serde(default = "default_printer_name")]
    pub printer_name: String,
    /// Primary label template. Missing files fall back to the built-in one.
    #[serde(default = "default_template_path")]
    pub template_path: Option<PathBuf>,
    /// Transport used as the router fallback and the CLI default.
    pub default_transport: TransportKind,
    #[serde(default = "default_target_length")]
    pub payload_target_length: usize,
    /// Delay between copies in a batch.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Let tag-memory commands through the safety gate.
    pub allow_dangerous: bool,
    pub timeouts: TimeoutConfig,
    pub bridge: BridgeConfig,
    pub serial: SerialConfig,
    pub network: NetworkConfig,
    pub os_copy: OsCopyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            printer_name: default_printer_name(),
            template_path: default_template_path(),
            default_transport: TransportKind::ProcessBridge,
            payload_target_length: DEFAULT_TARGET_LENGTH,
            pacing_ms: default_pacing_ms(),
            allow_dangerous: false,
            timeouts: TimeoutConfig::default(),
            bridge: BridgeConfig::default(),
            serial: SerialConfig::default(),
            network: NetworkConfig::default(),
            os_copy: OsCopyConfig::default(),
        }
    }
}

impl Config {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, EtiquetaError> {
        let text = fs::read_to_string(path).map_err(|e| {
            EtiquetaError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| {
            EtiquetaError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, EtiquetaError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), EtiquetaError> {
        if self.payload_target_length == 0 {
            return Err(EtiquetaError::Config(
                "payload_target_length must be at least 1".to_string(),
            ));
        }
        payload::check_target_length(self.payload_target_length)
            .map_err(|e| EtiquetaError::Config(format!("payload_target_length: {}", e)))?;
        if self.bridge.program.trim().is_empty() {
            return Err(EtiquetaError::Config(
                "bridge.program cannot be empty".to_string(),
            ));
        }
        if self.serial.chunk_size == 0 {
            return Err(EtiquetaError::Config(
                "serial.chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// Bounds on every blocking operation, in milliseconds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_ms: u64,
    pub send_ms: u64,
    pub discovery_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 5_000,
            send_ms: 10_000,
            discovery_ms: 5_000,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn send(&self) -> Duration {
        Duration::from_millis(self.send_ms)
    }

    pub fn discovery(&self) -> Duration {
        Duration::from_millis(self.discovery_ms)
    }
}

/// External interpreter invoked per send.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Interpreter executable, looked up on `PATH` when not a path.
    pub program: String,
    /// Arguments placed before the artifact path and printer name.
    pub args: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: if cfg!(windows) { "python" } else { "python3" }.to_string(),
            args: vec!["bridge/print_zpl.py".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub device: Option<String>,
    pub baud_rate: u32,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: 9600,
            chunk_size: 4096,
            chunk_delay_ms: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Printer address; listed ahead of discovered printers.
    pub host: Option<String>,
    pub port: u16,
    /// Addresses the discovery probe is sent to.
    pub broadcast_targets: Vec<String>,
    /// Substrings that identify a printer's discovery reply.
    pub vendor_markers: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: RAW_PRINT_PORT,
            broadcast_targets: [
                "255.255.255.255",
                "192.168.1.255",
                "192.168.0.255",
                "10.0.0.255",
                "172.16.0.255",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            vendor_markers: vec!["Zebra".to_string(), "ZD621R".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OsCopyConfig {
    /// Device path (`/dev/usb/lp0`) or shared printer name (`\\localhost\ZD621R`).
    pub device: Option<String>,
}
