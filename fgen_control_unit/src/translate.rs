//! Frequency and power translation.
//!
//! Pure functions mapping operator units to hardware control words, each
//! with range validation. Callers validate before touching any state.
//!
//! The synthesizer is integer-N without a fractional divider: one divider
//! step equals one 25 MHz reference period, so requested frequencies are
//! truncated to that resolution.

use fgen_common::consts::{
    ATTENUATOR_MAX_CODE, ATTENUATOR_STEP_DB, REFERENCE_CLOCK_HZ, RF_FREQ_MAX_HZ, RF_FREQ_MIN_HZ,
    RF_POWER_MAX_DBM, RF_POWER_MIN_DBM,
};
use std::fmt;
use thiserror::Error;

/// Quantity rejected by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Frequency,
    Power,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Frequency => "frequency",
            Self::Power => "power",
        })
    }
}

/// Translation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// Requested value outside the hardware range.
    #[error("{quantity} {value} out of range")]
    OutOfRange { quantity: Quantity, value: i64 },
}

/// Synthesizer divider for `freq_hz`.
///
/// # Errors
/// `OutOfRange` unless `freq_hz` lies in 10 MHz ..= 6 GHz.
pub fn hz_to_divider(freq_hz: u64) -> Result<u32, TranslateError> {
    if !(RF_FREQ_MIN_HZ..=RF_FREQ_MAX_HZ).contains(&freq_hz) {
        return Err(TranslateError::OutOfRange {
            quantity: Quantity::Frequency,
            value: freq_hz.min(i64::MAX as u64) as i64,
        });
    }
    // Fits: RF_FREQ_MAX_HZ / REFERENCE_CLOCK_HZ <= u32::MAX is asserted in consts.
    Ok((freq_hz / REFERENCE_CLOCK_HZ) as u32)
}

/// Attenuator code for `power_dbm`: half-dB steps below full power.
///
/// # Errors
/// `OutOfRange` unless `power_dbm` lies in -20 ..= 15 dBm.
pub fn dbm_to_attenuator_code(power_dbm: i8) -> Result<u8, TranslateError> {
    if !(RF_POWER_MIN_DBM..=RF_POWER_MAX_DBM).contains(&power_dbm) {
        return Err(TranslateError::OutOfRange {
            quantity: Quantity::Power,
            value: power_dbm as i64,
        });
    }
    let steps = ((RF_POWER_MAX_DBM as f32 - power_dbm as f32) / ATTENUATOR_STEP_DB).round();
    Ok(steps.clamp(0.0, ATTENUATOR_MAX_CODE as f32) as u8)
}

/// Requested power plus a calibration correction, kept inside the power range.
pub fn corrected_power(power_dbm: i8, correction_db: i8) -> i8 {
    power_dbm
        .saturating_add(correction_db)
        .clamp(RF_POWER_MIN_DBM, RF_POWER_MAX_DBM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn divider_at_band_edges() {
        assert_eq!(hz_to_divider(10_000_000), Ok(0));
        assert_eq!(hz_to_divider(2_400_000_000), Ok(96));
        assert_eq!(hz_to_divider(6_000_000_000), Ok(240));
        assert!(hz_to_divider(9_999_999).is_err());
        assert!(hz_to_divider(6_000_000_001).is_err());
        assert!(hz_to_divider(0).is_err());
    }

    #[test]
    fn divider_truncates_to_reference_steps() {
        assert_eq!(hz_to_divider(2_424_999_999), Ok(96));
        assert_eq!(hz_to_divider(2_425_000_000), Ok(97));
    }

    #[test]
    fn out_of_range_reports_value() {
        assert_eq!(
            hz_to_divider(u64::MAX),
            Err(TranslateError::OutOfRange {
                quantity: Quantity::Frequency,
                value: i64::MAX
            })
        );
        assert_eq!(
            dbm_to_attenuator_code(16).unwrap_err().to_string(),
            "power 16 out of range"
        );
    }

    #[test]
    fn attenuator_code_at_range_edges() {
        assert_eq!(dbm_to_attenuator_code(15), Ok(0));
        assert_eq!(dbm_to_attenuator_code(0), Ok(30));
        // 70 half-dB steps, clamped to the 6-bit code.
        assert_eq!(dbm_to_attenuator_code(-20), Ok(63));
        assert_eq!(dbm_to_attenuator_code(-17), Ok(63));
        assert_eq!(dbm_to_attenuator_code(-16), Ok(62));
        assert!(dbm_to_attenuator_code(-21).is_err());
        assert!(dbm_to_attenuator_code(i8::MAX).is_err());
    }

    #[test]
    fn corrected_power_stays_in_range() {
        assert_eq!(corrected_power(0, 0), 0);
        assert_eq!(corrected_power(14, 3), 15);
        assert_eq!(corrected_power(-19, -5), -20);
        assert_eq!(corrected_power(i8::MIN, i8::MIN), -20);
    }

    proptest! {
        #[test]
        fn divider_matches_integer_division(freq in RF_FREQ_MIN_HZ..=RF_FREQ_MAX_HZ) {
            prop_assert_eq!(hz_to_divider(freq), Ok((freq / REFERENCE_CLOCK_HZ) as u32));
        }

        #[test]
        fn frequency_outside_band_is_rejected(
            freq in prop_oneof![0..RF_FREQ_MIN_HZ, (RF_FREQ_MAX_HZ + 1)..=u64::MAX]
        ) {
            let is_out_of_range = matches!(
                hz_to_divider(freq),
                Err(TranslateError::OutOfRange { quantity: Quantity::Frequency, .. })
            );
            prop_assert!(is_out_of_range);
        }

        #[test]
        fn attenuator_code_is_monotonic(p in RF_POWER_MIN_DBM..RF_POWER_MAX_DBM) {
            let lower = dbm_to_attenuator_code(p).unwrap();
            let higher = dbm_to_attenuator_code(p + 1).unwrap();
            prop_assert!(lower <= ATTENUATOR_MAX_CODE);
            prop_assert!(higher <= lower);
        }

        #[test]
        fn power_outside_range_is_rejected(p in any::<i8>()) {
            let in_range = (RF_POWER_MIN_DBM..=RF_POWER_MAX_DBM).contains(&p);
            prop_assert_eq!(dbm_to_attenuator_code(p).is_ok(), in_range);
        }
    }
}
