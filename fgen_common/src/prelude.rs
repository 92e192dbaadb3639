//! Prelude module for common re-exports.
//!
//! ```rust
//! use fgen_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, GeneratorConfig, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{
    DEFAULT_FREQUENCY_HZ, DEFAULT_POWER_DBM, RF_FREQ_MAX_HZ, RF_FREQ_MIN_HZ, RF_POWER_MAX_DBM,
    RF_POWER_MIN_DBM,
};

// ─── Drivers ────────────────────────────────────────────────────────
pub use crate::hal::driver::{
    Attenuator, CalibrationStore, DriverSet, HalError, Peripheral, RfOutput, SensorDriver,
    SerialRx, SerialTx, StatusIndicator, Synthesizer, SystemReset,
};
pub use crate::hal::types::{CalibrationPoint, CalibrationTable, SensorReadings};

// ─── Control ────────────────────────────────────────────────────────
pub use crate::control::ThermalState;
