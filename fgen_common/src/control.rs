//! Control-level value types shared between the supervisor and the drivers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of the measured temperature against the thermal thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ThermalState {
    /// Below the warning threshold.
    #[default]
    Normal,
    /// Above the warning threshold, RF output untouched.
    Warning,
    /// Above the shutdown threshold, RF output forced off.
    Shutdown,
}

impl ThermalState {
    /// Returns `true` while RF output must stay off.
    #[inline]
    pub const fn blocks_rf(self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

impl fmt::Display for ThermalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "NORMAL",
            Self::Warning => "WARNING",
            Self::Shutdown => "SHUTDOWN",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_normal() {
        assert_eq!(ThermalState::default(), ThermalState::Normal);
    }

    #[test]
    fn only_shutdown_blocks_rf() {
        assert!(!ThermalState::Normal.blocks_rf());
        assert!(!ThermalState::Warning.blocks_rf());
        assert!(ThermalState::Shutdown.blocks_rf());
        assert_eq!(ThermalState::Shutdown.to_string(), "SHUTDOWN");
    }
}
