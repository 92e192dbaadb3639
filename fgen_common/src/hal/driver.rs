//! Driver traits and error types.
//!
//! This module defines:
//! - `HalError` enum - Error types for driver operations
//! - `Peripheral` trait - Common lifecycle of every driver
//! - One trait per peripheral consumed by the control unit
//! - `DriverSet` - The complete board, initialised and released as a unit
//!
//! All driver methods take `&self`: a driver is shared between tasks and
//! serialises access internally. Calls may block, bounded by the timeout
//! where one is passed.

use crate::hal::types::{CalibrationTable, SensorReadings};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Error types for driver operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Operation did not complete within its timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Peripheral is gone (closed transport, unplugged device)
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// Board not found in the registry
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Calibration persistence error
    #[error("State persistence error: {0}")]
    PersistenceError(String),
}

/// Lifecycle shared by every driver.
///
/// # Lifecycle
///
/// 1. `init()` - Called once before any task starts
/// 2. trait-specific operations - Called concurrently by the tasks
/// 3. `shutdown()` - Called once after every task has stopped
pub trait Peripheral: Send + Sync {
    /// Short identifier used in logs (e.g., "sensor", "synthesizer").
    fn name(&self) -> &'static str;

    /// Bring the peripheral into a known state.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if the peripheral cannot be used.
    fn init(&self) -> Result<(), HalError> {
        Ok(())
    }

    /// Release the peripheral.
    fn shutdown(&self) -> Result<(), HalError> {
        Ok(())
    }
}

/// Temperature, supply voltage and current monitors.
pub trait SensorDriver: Peripheral {
    /// Acquire one reading of all channels.
    ///
    /// # Errors
    /// `HalError::Timeout` when the acquisition exceeds `timeout`.
    fn read(&self, timeout: Duration) -> Result<SensorReadings, HalError>;
}

/// Integer-N frequency synthesizer.
pub trait Synthesizer: Peripheral {
    /// Program the feedback divider.
    fn set_divider(&self, divider: u32) -> Result<(), HalError>;

    /// Current state of the lock-detect line.
    fn is_locked(&self) -> Result<bool, HalError>;
}

/// RF output switch.
pub trait RfOutput: Peripheral {
    /// Enable or disable the output stage.
    fn set_enabled(&self, enabled: bool) -> Result<(), HalError>;
}

/// Digital step attenuator.
pub trait Attenuator: Peripheral {
    /// Latch an attenuation code.
    fn write_code(&self, code: u8) -> Result<(), HalError>;
}

/// Non-volatile calibration storage.
pub trait CalibrationStore: Peripheral {
    /// Read the stored table. An empty store yields an empty table.
    fn load(&self) -> Result<CalibrationTable, HalError>;

    /// Persist `table`, replacing the stored one.
    fn save(&self, table: &CalibrationTable) -> Result<(), HalError>;
}

/// Inbound half of the serial transport.
pub trait SerialRx: Peripheral {
    /// Wait up to `timeout` for one byte.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    ///
    /// # Errors
    /// `HalError::Disconnected` once the transport is closed for good.
    fn read_byte(&self, timeout: Duration) -> Result<Option<u8>, HalError>;
}

/// Outbound half of the serial transport.
pub trait SerialTx: Peripheral {
    /// Write all of `bytes`.
    fn write(&self, bytes: &[u8]) -> Result<(), HalError>;
}

/// Front panel LEDs.
pub trait StatusIndicator: Peripheral {
    /// Status LED, lit while RF output is enabled.
    fn set_status(&self, on: bool) -> Result<(), HalError>;

    /// Error LED, lit on an unrecoverable fault.
    fn set_error(&self, on: bool) -> Result<(), HalError>;
}

/// Board reset line.
pub trait SystemReset: Peripheral {
    /// Request a full system reset.
    fn reset(&self) -> Result<(), HalError>;
}

/// Every peripheral of one board.
#[derive(Clone)]
pub struct DriverSet {
    pub serial_rx: Arc<dyn SerialRx>,
    pub serial_tx: Arc<dyn SerialTx>,
    pub sensor: Arc<dyn SensorDriver>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub rf: Arc<dyn RfOutput>,
    pub attenuator: Arc<dyn Attenuator>,
    pub indicator: Arc<dyn StatusIndicator>,
    pub calibration: Arc<dyn CalibrationStore>,
    pub reset: Arc<dyn SystemReset>,
}

impl DriverSet {
    /// Initialization order. Release runs in reverse.
    fn ordered(&self) -> [&dyn Peripheral; 9] {
        [
            self.serial_rx.as_ref(),
            self.serial_tx.as_ref(),
            self.sensor.as_ref(),
            self.synthesizer.as_ref(),
            self.rf.as_ref(),
            self.attenuator.as_ref(),
            self.indicator.as_ref(),
            self.calibration.as_ref(),
            self.reset.as_ref(),
        ]
    }

    /// Initialize every driver in order, stopping at the first failure.
    ///
    /// Drivers already initialised when a later one fails are released again.
    ///
    /// # Errors
    /// The first `init()` error.
    pub fn init_all(&self) -> Result<(), HalError> {
        let drivers = self.ordered();
        for (idx, driver) in drivers.iter().enumerate() {
            if let Err(e) = driver.init() {
                warn!(driver = driver.name(), error = %e, "Driver initialization failed");
                for done in drivers[..idx].iter().rev() {
                    let _ = done.shutdown();
                }
                return Err(e);
            }
            info!(driver = driver.name(), "Driver initialized");
        }
        Ok(())
    }

    /// Release every driver in reverse order.
    ///
    /// All drivers are released even if some fail; the first error is returned.
    pub fn shutdown_all(&self) -> Result<(), HalError> {
        let mut first_err = None;
        for driver in self.ordered().iter().rev() {
            if let Err(e) = driver.shutdown() {
                warn!(driver = driver.name(), error = %e, "Driver release failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
