//! Thermal state machine.
//!
//! The state is re-derived from every temperature sample:
//! above `shutdown_c` → Shutdown, above `warning_c` → Warning, else Normal.
//! Transitions are reported so the supervisor can act on edges.

use fgen_common::config::ThermalConfig;
use fgen_common::control::ThermalState;

/// Temperature thresholds [°C]. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalThresholds {
    pub warning_c: f64,
    pub shutdown_c: f64,
}

impl From<&ThermalConfig> for ThermalThresholds {
    fn from(config: &ThermalConfig) -> Self {
        Self {
            warning_c: config.warning_c,
            shutdown_c: config.shutdown_c,
        }
    }
}

impl Default for ThermalThresholds {
    fn default() -> Self {
        Self::from(&ThermalConfig::default())
    }
}

/// Classify one temperature sample.
#[inline]
pub fn classify(temperature_c: f64, thresholds: &ThermalThresholds) -> ThermalState {
    if temperature_c > thresholds.shutdown_c {
        ThermalState::Shutdown
    } else if temperature_c > thresholds.warning_c {
        ThermalState::Warning
    } else {
        ThermalState::Normal
    }
}

/// Result of feeding one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermalTransition {
    pub from: ThermalState,
    pub to: ThermalState,
}

impl ThermalTransition {
    /// Returns `true` if this sample moved the machine into `state`.
    #[inline]
    pub fn entered(&self, state: ThermalState) -> bool {
        self.from != state && self.to == state
    }
}

/// Thermal state machine.
#[derive(Debug, Clone)]
pub struct ThermalStateMachine {
    state: ThermalState,
    thresholds: ThermalThresholds,
}

impl ThermalStateMachine {
    pub fn new(thresholds: ThermalThresholds) -> Self {
        Self {
            state: ThermalState::Normal,
            thresholds,
        }
    }

    #[inline]
    pub const fn state(&self) -> ThermalState {
        self.state
    }

    #[inline]
    pub const fn thresholds(&self) -> &ThermalThresholds {
        &self.thresholds
    }

    /// Classify `temperature_c` and move to the resulting state.
    pub fn handle_sample(&mut self, temperature_c: f64) -> ThermalTransition {
        let from = self.state;
        self.state = classify(temperature_c, &self.thresholds);
        ThermalTransition {
            from,
            to: self.state,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
