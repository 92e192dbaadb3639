//! Reply formatting.

use fgen_common::hal::types::SensorReadings;

/// Reply to one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok,
    Identity(String),
    Status(SensorReadings),
    Frequency(u64),
    Power(i8),
    Output(bool),
    FrequencyOutOfRange,
    PowerOutOfRange,
    ThermalInterlock,
    CalibrationSaveFailed,
    UnknownCommand,
}

impl Response {
    /// Reply lines, without terminators.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Ok => vec!["OK".to_string()],
            Self::Identity(idn) => vec![idn.clone()],
            Self::Status(r) => vec![format!(
                "TEMP:{:.1},VOLT:{:.2},CURR:{:.2}",
                r.temperature_c, r.voltage_v, r.current_a
            )],
            Self::Frequency(hz) => vec![hz.to_string()],
            Self::Power(dbm) => vec![dbm.to_string()],
            Self::Output(on) => vec![if *on { "ON" } else { "OFF" }.to_string()],
            Self::FrequencyOutOfRange => vec![
                "ERROR: Frequency out of range".to_string(),
                "Valid range: 10 MHz - 6 GHz".to_string(),
            ],
            Self::PowerOutOfRange => vec![
                "ERROR: Power out of range".to_string(),
                "Valid range: -20 to +15 dBm".to_string(),
            ],
            Self::ThermalInterlock => vec!["ERROR: Thermal shutdown active".to_string()],
            Self::CalibrationSaveFailed => vec!["ERROR: Calibration save failed".to_string()],
            Self::UnknownCommand => vec!["ERROR: Unknown command".to_string()],
        }
    }
}
