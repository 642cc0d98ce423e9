//! Configuration loading traits and types.
//!
//! This module provides the TOML configuration surface of the CTR-700 I/O
//! runtime: shared service settings, event-loop tuning, watchdog servicing,
//! simulation defaults and the list of channel nodes.
//!
//! # Usage
//!
//! ```rust,no_run
//! use ctr700_common::config::{AppConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = AppConfig::load_validated(Path::new("ctr700.toml"))?;
//!     println!("Service: {} ({} nodes)", config.shared.service_name, config.nodes.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::consts::{
    DEFAULT_IDLE_TICK_MS, DEFAULT_STATUS_PERIOD_MS, DEFAULT_WATCHDOG_SERVICE_MS,
    DI_CHANNELS, AI_CHANNELS,
};
use crate::node::config::NodeConfig;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// configuration files.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields of the service.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "ctr700-line-3"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Driver backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory board, no hardware access.
    #[default]
    Simulation,
    /// Vendor driver library (`libctr700drv`).
    Native,
}

impl BackendKind {
    /// Registry name of the backend.
    pub fn name(self) -> &'static str {
        match self {
            Self::Simulation => "simulation",
            Self::Native => "native",
        }
    }
}

/// Event-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Backend used to reach the board.
    pub backend: BackendKind,
    /// How long an analog node shows "Altered" after a published sample.
    pub status_period_ms: u64,
    /// Upper bound for one blocking wait of the event loop.
    pub idle_tick_ms: u64,
    /// Emit pipeline traces for every node, not only `DBG_` ones.
    pub trace_all: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            status_period_ms: DEFAULT_STATUS_PERIOD_MS,
            idle_tick_ms: DEFAULT_IDLE_TICK_MS,
            trace_all: false,
        }
    }
}

/// Board watchdog servicing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Enable the hardware watchdog at startup.
    pub enabled: bool,
    /// Only monitor (no reset on timeout).
    pub monitor_only: bool,
    /// Service interval.
    pub service_interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            monitor_only: true,
            service_interval_ms: DEFAULT_WATCHDOG_SERVICE_MS,
        }
    }
}

/// Initial board state for the simulation backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Digital inputs that start high (channel numbers).
    pub digital_inputs_high: Vec<u8>,
    /// Raw ADC values per analog channel.
    pub analog_raw: Vec<u16>,
    /// Run/stop switch starts in "Run".
    pub run_switch: bool,
}

impl SimulationConfig {
    /// Validate channel numbers against the board layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ch) = self
            .digital_inputs_high
            .iter()
            .find(|&&ch| usize::from(ch) >= DI_CHANNELS)
        {
            return Err(ConfigError::ValidationError(format!(
                "simulation.digital_inputs_high: channel {ch} out of range (0..{DI_CHANNELS})"
            )));
        }
        if self.analog_raw.len() > AI_CHANNELS {
            return Err(ConfigError::ValidationError(format!(
                "simulation.analog_raw: {} values for {AI_CHANNELS} channels",
                self.analog_raw.len()
            )));
        }
        Ok(())
    }
}

/// Complete application configuration (`ctr700.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service identity and logging.
    pub shared: SharedConfig,
    /// Event loop tuning.
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Watchdog servicing.
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    /// Simulation backend defaults.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Channel nodes, opened in file order.
    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeConfig>,
}

impl AppConfig {
    /// Parse from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load from file and validate.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks that do not belong to a single node.
    ///
    /// Per-node property validation happens when the node opens; a node with
    /// broken properties stays configured but non-functional.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.simulation.validate()?;

        if self.runtime.idle_tick_ms == 0 {
            return Err(ConfigError::ValidationError(
                "runtime.idle_tick_ms must be > 0".to_string(),
            ));
        }
        if self.watchdog.enabled && self.watchdog.service_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "watchdog.service_interval_ms must be > 0".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for node in &self.nodes {
            let name = node.name();
            if name.is_empty() {
                continue;
            }
            if !names.insert(name) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate node name: {name}"
                )));
            }
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"")
                .unwrap()
                .level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"error\"")
                .unwrap()
                .level,
            LogLevel::Error
        );
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = AppConfig::load(Path::new("/nonexistent/path/ctr700.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = AppConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_minimal_app_config_defaults() {
        let config = AppConfig::from_toml(
            r#"
[shared]
service_name = "ctr700"
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.runtime.backend, BackendKind::Simulation);
        assert_eq!(config.runtime.status_period_ms, DEFAULT_STATUS_PERIOD_MS);
        assert!(!config.watchdog.enabled);
        assert!(config.nodes.is_empty());
    }

    #[test]
    fn test_simulation_channel_out_of_range() {
        let config = AppConfig::from_toml(
            r#"
[shared]
service_name = "ctr700"

[simulation]
digital_inputs_high = [3, 42]
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("42")
        ));
    }

    #[test]
    fn test_zero_idle_tick_rejected() {
        let config = AppConfig::from_toml(
            r#"
[shared]
service_name = "ctr700"

[runtime]
idle_tick_ms = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
