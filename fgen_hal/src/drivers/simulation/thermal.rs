//! Thermal and electrical model of the simulated board.
//!
//! The output stage heats the board in proportion to the delivered power.
//! Temperature follows a first-order lag toward the steady-state value.

use fgen_common::config::SimulationConfig;
use fgen_common::consts::ATTENUATOR_MAX_CODE;
use std::time::Instant;

/// First-order thermal model.
#[derive(Debug, Clone)]
pub struct ThermalModel {
    temperature_c: f64,
    ambient_c: f64,
    rf_heating_c: f64,
    time_constant_s: f64,
    last_update: Instant,
}

impl ThermalModel {
    /// Start at ambient temperature.
    pub fn new(config: &SimulationConfig, now: Instant) -> Self {
        Self {
            temperature_c: config.ambient_c,
            ambient_c: config.ambient_c,
            rf_heating_c: config.rf_heating_c,
            time_constant_s: config.thermal_time_constant_s,
            last_update: now,
        }
    }

    /// Advance the model to `now` with the given heat load in 0..=1.
    pub fn advance(&mut self, now: Instant, heat_fraction: f64) -> f64 {
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        self.step(dt, heat_fraction)
    }

    /// Advance the model by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64, heat_fraction: f64) -> f64 {
        let target = self.ambient_c + self.rf_heating_c * heat_fraction.clamp(0.0, 1.0);
        let alpha = 1.0 - (-dt_s / self.time_constant_s).exp();
        self.temperature_c += (target - self.temperature_c) * alpha;
        self.temperature_c
    }
}

/// Fraction of full output power delivered for an attenuator code.
pub fn power_fraction(rf_enabled: bool, attenuator_code: u8) -> f64 {
    if !rf_enabled {
        return 0.0;
    }
    let code = attenuator_code.min(ATTENUATOR_MAX_CODE) as f64;
    1.0 - code / ATTENUATOR_MAX_CODE as f64
}

/// Supply voltage and current for a power fraction.
///
/// The supply sags slightly under load through a fixed source resistance.
pub fn supply(config: &SimulationConfig, power_fraction: f64) -> (f64, f64) {
    const SOURCE_RESISTANCE_OHM: f64 = 0.1;
    let current = config.idle_current_a + config.rf_current_a * power_fraction;
    let voltage = config.supply_v - current * SOURCE_RESISTANCE_OHM;
    (voltage, current)
}
