//! Value types exchanged with the drivers.

use crate::consts::{
    CALIBRATION_POINTS, CURRENT_SENSOR_RANGE_A, TEMP_SENSOR_RANGE_C, VOLTAGE_SENSOR_RANGE_V,
};
use serde::{Deserialize, Serialize};

/// One acquisition of the analog monitors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    /// Board temperature [°C].
    pub temperature_c: f64,
    /// Supply voltage [V].
    pub voltage_v: f64,
    /// Output stage current [A].
    pub current_a: f64,
}

impl SensorReadings {
    /// Creates a reading clamped to the physical range of each sensor.
    pub fn new(temperature_c: f64, voltage_v: f64, current_a: f64) -> Self {
        Self {
            temperature_c,
            voltage_v,
            current_a,
        }
        .clamped()
    }

    /// Clamps every channel to its sensor's physical range.
    ///
    /// NaN passes through unchanged; see [`is_valid`](Self::is_valid).
    pub fn clamped(self) -> Self {
        Self {
            temperature_c: clamp_channel(self.temperature_c, TEMP_SENSOR_RANGE_C),
            voltage_v: clamp_channel(self.voltage_v, VOLTAGE_SENSOR_RANGE_V),
            current_a: clamp_channel(self.current_a, CURRENT_SENSOR_RANGE_A),
        }
    }

    /// Returns `false` when any channel is not a finite number.
    pub fn is_valid(&self) -> bool {
        self.temperature_c.is_finite() && self.voltage_v.is_finite() && self.current_a.is_finite()
    }
}

impl Default for SensorReadings {
    /// Power-up values before the first acquisition.
    fn default() -> Self {
        Self {
            temperature_c: 25.0,
            voltage_v: 5.0,
            current_a: 0.0,
        }
    }
}

fn clamp_channel(value: f64, (lo, hi): (f64, f64)) -> f64 {
    value.clamp(lo, hi)
}

/// A single calibration measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Frequency at which the point was measured [Hz].
    pub frequency_hz: u64,
    /// Power correction to apply at this frequency [dB].
    pub power_correction_db: i8,
    /// Drift of the correction per °C.
    pub temp_coefficient: f64,
}

/// Fixed-capacity calibration table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    points: heapless::Vec<CalibrationPoint, CALIBRATION_POINTS>,
}

impl CalibrationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point. Returns `false` and drops the point when the table is full.
    pub fn add_point(&mut self, point: CalibrationPoint) -> bool {
        self.points.push(point).is_ok()
    }

    /// Stored points in insertion order.
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` when no point is stored.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Power correction for `frequency_hz` [dB].
    ///
    /// Interpolation between points is not implemented yet; this always
    /// returns 0 so the requested power passes through unchanged.
    pub fn correction_for(&self, _frequency_hz: u64) -> i8 {
        0
    }
}
