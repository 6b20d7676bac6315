//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::consumer::central::{CHARACTERISTIC_UUID, SERVICE_UUID};
use crate::consumer::ExportFormat;
use crate::error::{MonitorError, Result};
use crate::telemetry::Delimiter;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub central: CentralConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telemetry cycle configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Cycles per screen before rotating, 0 keeps the first screen
    #[serde(default = "default_screen_cycle_ticks")]
    pub screen_cycle_ticks: u32,
}

/// Removable storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: String,

    #[serde(default = "default_identity_file")]
    pub identity_file: String,

    #[serde(default = "default_log_extension")]
    pub log_extension: String,

    #[serde(default)]
    pub delimiter: Delimiter,
}

/// Radio bridge configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_link_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_iio_device")]
    pub iio_device: String,
}

/// BLE central (consumer) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CentralConfig {
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,

    #[serde(default = "default_characteristic_uuid")]
    pub characteristic_uuid: String,

    #[serde(default = "default_scan_count")]
    pub scan_count: usize,

    #[serde(default = "default_scan_timeout_s")]
    pub scan_timeout_s: u64,

    #[serde(default)]
    pub export: ExportFormat,

    #[serde(default)]
    pub log_dir: Option<String>,
}

/// Diagnostic logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_cycle_interval_ms() -> u64 { 2000 }
fn default_screen_cycle_ticks() -> u32 { 5 }

fn default_storage_root() -> String { "./sd".to_string() }
fn default_identity_file() -> String { "CONFIG.TXT".to_string() }
fn default_log_extension() -> String { "CSV".to_string() }

fn default_link_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 9600 }

fn default_iio_device() -> String { "/sys/bus/iio/devices/iio:device0".to_string() }

fn default_service_uuid() -> String { SERVICE_UUID.to_string() }
fn default_characteristic_uuid() -> String { CHARACTERISTIC_UUID.to_string() }
fn default_scan_count() -> usize { 5 }
fn default_scan_timeout_s() -> u64 { 10 }

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            screen_cycle_ticks: default_screen_cycle_ticks(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            identity_file: default_identity_file(),
            log_extension: default_log_extension(),
            delimiter: Delimiter::default(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: default_link_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            iio_device: default_iio_device(),
        }
    }
}

impl Default for CentralConfig {
    fn default() -> Self {
        Self {
            service_uuid: default_service_uuid(),
            characteristic_uuid: default_characteristic_uuid(),
            scan_count: default_scan_count(),
            scan_timeout_s: default_scan_timeout_s(),
            export: ExportFormat::default(),
            log_dir: None,
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> MonitorError {
    MonitorError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use environment_monitor::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load a config file, or use defaults if it does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse and validate TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.node.cycle_interval_ms == 0 || self.node.cycle_interval_ms > 60000 {
            return Err(invalid("cycle_interval_ms must be between 1 and 60000"));
        }

        if self.storage.root.is_empty() {
            return Err(invalid("storage root cannot be empty"));
        }

        if self.storage.identity_file.is_empty() || self.storage.identity_file.contains('/') {
            return Err(invalid("identity_file must be a plain file name"));
        }

        let ext = &self.storage.log_extension;
        if ext.is_empty() || ext.len() > 3 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("log_extension must be 1-3 alphanumeric characters"));
        }

        if self.link.port.is_empty() {
            return Err(invalid("link port cannot be empty"));
        }

        if ![9600, 19200, 38400, 57600, 115200].contains(&self.link.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200"));
        }

        if self.sensor.iio_device.is_empty() {
            return Err(invalid("sensor iio_device cannot be empty"));
        }

        for (name, value) in [
            ("service_uuid", &self.central.service_uuid),
            ("characteristic_uuid", &self.central.characteristic_uuid),
        ] {
            if uuid::Uuid::parse_str(value).is_err() {
                return Err(invalid(format!("{} '{}' is not a valid UUID", name, value)));
            }
        }

        if self.central.scan_count == 0 {
            return Err(invalid("scan_count must be greater than 0"));
        }

        if self.central.scan_timeout_s == 0 || self.central.scan_timeout_s > 600 {
            return Err(invalid("scan_timeout_s must be between 1 and 600"));
        }

        Ok(())
    }
}
