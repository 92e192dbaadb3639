//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! for the frequency generator binaries.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fgen_common::config::{ConfigLoader, GeneratorConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = GeneratorConfig::load(Path::new("fgen.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    MAX_LINE_LEN, PLL_PERIOD, SAFETY_PERIOD, SENSOR_FAILURE_THRESHOLD, SENSOR_TIMEOUT,
    TEMP_SENSOR_RANGE_C, TEMP_SHUTDOWN_C, TEMP_WARNING_C,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

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
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across all applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "fgen-bench-01"
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
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "fgen".to_string(),
        }
    }
}

/// Identity reported by `SYS:IDN?`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Model designation.
    pub model: String,
    /// Unit serial number.
    pub serial: String,
    /// Firmware version string.
    pub version: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: "FG-STM32H743".to_string(),
            serial: "SN123456".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

/// Task periods and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Safety supervisor sampling period [ms].
    pub safety_period_ms: u64,
    /// PLL supervisor polling period [ms].
    pub pll_period_ms: u64,
    /// Bound on a single sensor acquisition [ms].
    pub sensor_timeout_ms: u64,
    /// Serial poll granularity of the command task [ms].
    pub serial_poll_ms: u64,
    /// Consecutive sensor failures before a warning is reported.
    pub sensor_failure_threshold: u32,
}

impl TimingConfig {
    /// Safety supervisor period.
    pub fn safety_period(&self) -> Duration {
        Duration::from_millis(self.safety_period_ms)
    }

    /// PLL supervisor period.
    pub fn pll_period(&self) -> Duration {
        Duration::from_millis(self.pll_period_ms)
    }

    /// Sensor acquisition timeout.
    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_timeout_ms)
    }

    /// Serial poll timeout.
    pub fn serial_poll(&self) -> Duration {
        Duration::from_millis(self.serial_poll_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            safety_period_ms: SAFETY_PERIOD.as_millis() as u64,
            pll_period_ms: PLL_PERIOD.as_millis() as u64,
            sensor_timeout_ms: SENSOR_TIMEOUT.as_millis() as u64,
            serial_poll_ms: 50,
            sensor_failure_threshold: SENSOR_FAILURE_THRESHOLD,
        }
    }
}

/// Thermal thresholds [°C].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThermalConfig {
    /// Above this temperature a warning is reported.
    pub warning_c: f64,
    /// Above this temperature RF output is forced off.
    pub shutdown_c: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            warning_c: TEMP_WARNING_C,
            shutdown_c: TEMP_SHUTDOWN_C,
        }
    }
}

/// Command protocol options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Longest line accepted before it is cut.
    pub max_line_len: usize,
    /// Copy supervisor reports onto the serial output.
    pub echo_reports: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_line_len: MAX_LINE_LEN,
            echo_reports: true,
        }
    }
}

/// Board selection and persistent storage location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BoardConfig {
    /// Registered board name.
    pub driver: String,
    /// Calibration file; memory-only storage when absent.
    pub calibration_path: Option<PathBuf>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            driver: "simulation".to_string(),
            calibration_path: None,
        }
    }
}

/// Parameters of the simulated hardware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ambient temperature [°C].
    pub ambient_c: f64,
    /// Steady-state temperature rise at full power [°C].
    pub rf_heating_c: f64,
    /// First-order thermal time constant [s].
    pub thermal_time_constant_s: f64,
    /// Nominal supply voltage [V].
    pub supply_v: f64,
    /// Supply current with RF off [A].
    pub idle_current_a: f64,
    /// Additional supply current at full power [A].
    pub rf_current_a: f64,
    /// Time from a frequency write until the PLL reports lock [ms].
    pub lock_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            rf_heating_c: 40.0,
            thermal_time_constant_s: 30.0,
            supply_v: 5.0,
            idle_current_a: 0.15,
            rf_current_a: 0.85,
            lock_delay_ms: 100,
        }
    }
}

/// Complete configuration of the generator.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "fgen-bench-01"
///
/// [thermal]
/// warning_c = 65.0
/// shutdown_c = 80.0
///
/// [board]
/// calibration_path = "/var/lib/fgen/calibration.bin"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Common fields.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Identification.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Task timing.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Thermal thresholds.
    #[serde(default)]
    pub thermal: ThermalConfig,
    /// Protocol options.
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Board selection.
    #[serde(default)]
    pub board: BoardConfig,
    /// Simulated hardware.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl GeneratorConfig {
    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` on the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let t = &self.thermal;
        if !(t.warning_c < t.shutdown_c) {
            return Err(ConfigError::ValidationError(format!(
                "thermal.warning_c ({}) must be below thermal.shutdown_c ({})",
                t.warning_c, t.shutdown_c
            )));
        }
        let (lo, hi) = TEMP_SENSOR_RANGE_C;
        if t.shutdown_c <= lo || t.shutdown_c >= hi {
            return Err(ConfigError::ValidationError(format!(
                "thermal.shutdown_c ({}) must lie inside the sensor range {lo}..{hi}",
                t.shutdown_c
            )));
        }

        let timing = &self.timing;
        if timing.safety_period_ms == 0 || timing.pll_period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "task periods must be non-zero".to_string(),
            ));
        }
        if timing.sensor_timeout_ms >= timing.safety_period_ms {
            return Err(ConfigError::ValidationError(format!(
                "timing.sensor_timeout_ms ({}) must be shorter than timing.safety_period_ms ({})",
                timing.sensor_timeout_ms, timing.safety_period_ms
            )));
        }
        if timing.serial_poll_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timing.serial_poll_ms must be non-zero".to_string(),
            ));
        }
        if timing.sensor_failure_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "timing.sensor_failure_threshold must be at least 1".to_string(),
            ));
        }

        if self.protocol.max_line_len == 0 {
            return Err(ConfigError::ValidationError(
                "protocol.max_line_len must be non-zero".to_string(),
            ));
        }
        if self.board.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "board.driver cannot be empty".to_string(),
            ));
        }
        if self.simulation.thermal_time_constant_s <= 0.0 {
            return Err(ConfigError::ValidationError(
                "simulation.thermal_time_constant_s must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// Provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
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

/// Load and validate a [`GeneratorConfig`].
///
/// # Errors
///
/// Propagates loading and validation errors.
pub fn load_generator_config(path: &Path) -> Result<GeneratorConfig, ConfigError> {
    let config = GeneratorConfig::load(path)?;
    config.validate()?;
    Ok(config)
}
