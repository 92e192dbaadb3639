//! Error taxonomy.
//!
//! Every fault the supervisor can meet falls in one [`FaultKind`]. Only a
//! transport fault ends a task; every other kind is handled where it occurs
//! and leaves the system running.

use fgen_common::hal::driver::HalError;
use std::fmt;
use thiserror::Error;

/// Classification of faults by how the system recovers from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Operator input outside a validated bound. Answered with an error reply.
    OutOfRange,
    /// Sensor acquisition timed out. Last known values are kept.
    SensorUnavailable,
    /// Unmatched command line. Answered with an error reply.
    UnknownCommand,
    /// Temperature above the shutdown threshold. RF output is forced off.
    ThermalShutdown,
    /// Hard driver or serial failure. The affected task halts.
    TransportFault,
}

impl FaultKind {
    /// Returns `true` if the system stays in a continuable state.
    #[inline]
    pub const fn is_recoverable(self) -> bool {
        !matches!(self, Self::TransportFault)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OutOfRange => "out of range",
            Self::SensorUnavailable => "sensor unavailable",
            Self::UnknownCommand => "unknown command",
            Self::ThermalShutdown => "thermal shutdown",
            Self::TransportFault => "transport fault",
        })
    }
}

/// Unrecoverable failure that halted a task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{peripheral} transport fault: {source}")]
pub struct TaskError {
    /// Peripheral whose driver failed.
    pub peripheral: &'static str,
    /// Driver error.
    #[source]
    pub source: HalError,
}

impl TaskError {
    /// Closure for `map_err` naming the failing peripheral.
    pub fn transport(peripheral: &'static str) -> impl FnOnce(HalError) -> Self {
        move |source| Self { peripheral, source }
    }

    /// Always [`FaultKind::TransportFault`].
    #[inline]
    pub const fn kind(&self) -> FaultKind {
        FaultKind::TransportFault
    }
}

/// Failure to start or stop the system.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A driver failed to initialize.
    #[error("driver initialization failed: {0}")]
    DriverInit(#[from] HalError),

    /// Programming the power-up frequency and power failed.
    #[error("power-up programming failed: {0}")]
    PowerUp(#[source] TaskError),

    /// A task thread could not be created.
    #[error("failed to spawn {task} task: {reason}")]
    Spawn {
        /// Task name.
        task: &'static str,
        /// OS error text.
        reason: String,
    },

    /// A task thread panicked.
    #[error("{0} task panicked")]
    TaskPanicked(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_faults_are_unrecoverable() {
        for kind in [
            FaultKind::OutOfRange,
            FaultKind::SensorUnavailable,
            FaultKind::UnknownCommand,
            FaultKind::ThermalShutdown,
        ] {
            assert!(kind.is_recoverable(), "{kind}");
        }
        assert!(!FaultKind::TransportFault.is_recoverable());
    }

    #[test]
    fn task_error_names_peripheral() {
        let err = TaskError::transport("synthesizer")(HalError::CommunicationError(
            "spi nak".into(),
        ));
        assert_eq!(err.kind(), FaultKind::TransportFault);
        let text = err.to_string();
        assert!(text.contains("synthesizer"));
        assert!(text.contains("spi nak"));
    }
}
