//! System-wide constants.
//!
//! Hardware limits of the synthesizer chain and the default timing of the
//! supervisor tasks. Configuration may override the timing values, never
//! the RF limits.

use static_assertions::const_assert;
use std::time::Duration;

/// Lowest programmable output frequency [Hz] (10 MHz).
pub const RF_FREQ_MIN_HZ: u64 = 10_000_000;

/// Highest programmable output frequency [Hz] (6 GHz).
pub const RF_FREQ_MAX_HZ: u64 = 6_000_000_000;

/// Synthesizer reference clock [Hz]. One divider step equals one reference period.
pub const REFERENCE_CLOCK_HZ: u64 = 25_000_000;

/// Lowest output power [dBm].
pub const RF_POWER_MIN_DBM: i8 = -20;

/// Highest output power [dBm].
pub const RF_POWER_MAX_DBM: i8 = 15;

/// Attenuator step size [dB].
pub const ATTENUATOR_STEP_DB: f32 = 0.5;

/// Largest attenuator control code.
pub const ATTENUATOR_MAX_CODE: u8 = 63;

/// Temperature above which a warning is reported [°C].
pub const TEMP_WARNING_C: f64 = 70.0;

/// Temperature above which RF output is forced off [°C].
pub const TEMP_SHUTDOWN_C: f64 = 85.0;

/// Physical range of the temperature sensor [°C].
pub const TEMP_SENSOR_RANGE_C: (f64, f64) = (-40.0, 125.0);

/// Physical range of the supply voltage monitor [V].
pub const VOLTAGE_SENSOR_RANGE_V: (f64, f64) = (0.0, 5.5);

/// Physical range of the output current monitor [A].
pub const CURRENT_SENSOR_RANGE_A: (f64, f64) = (0.0, 2.0);

/// Frequency programmed at power-up [Hz].
pub const DEFAULT_FREQUENCY_HZ: u64 = 2_400_000_000;

/// Power programmed at power-up [dBm].
pub const DEFAULT_POWER_DBM: i8 = 0;

/// Safety supervisor sampling period.
pub const SAFETY_PERIOD: Duration = Duration::from_millis(1000);

/// PLL supervisor polling period.
pub const PLL_PERIOD: Duration = Duration::from_millis(500);

/// Upper bound on a single sensor acquisition.
pub const SENSOR_TIMEOUT: Duration = Duration::from_millis(200);

/// Consecutive sensor failures before a warning is reported.
pub const SENSOR_FAILURE_THRESHOLD: u32 = 3;

/// Longest command line accepted before it is cut.
pub const MAX_LINE_LEN: usize = 255;

/// Capacity of the calibration table.
pub const CALIBRATION_POINTS: usize = 256;

/// Manufacturer field of the identification string.
pub const IDN_MANUFACTURER: &str = "FrequencyGenerator";

// Full-scale attenuation must cover the power range.
const_assert!(((RF_POWER_MAX_DBM - RF_POWER_MIN_DBM) as u8) * 2 >= ATTENUATOR_MAX_CODE);
const_assert!(RF_FREQ_MAX_HZ / REFERENCE_CLOCK_HZ <= u32::MAX as u64);
