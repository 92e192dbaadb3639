//! PLL Supervisor.
//!
//! Polls the synthesizer lock indicator once per PLL period while RF output
//! is enabled and idles otherwise. An unlocked PLL is reported with the
//! current target frequency; output and frequency are left alone.

use crate::error::TaskError;
use crate::report::Reporter;
use crate::state::PllWriter;
use fgen_common::hal::driver::{HalError, Synthesizer};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PllOutcome {
    /// RF output off; nothing polled.
    Idle,
    Locked,
    Unlocked,
    /// The lock indicator read timed out; flag unchanged.
    Unavailable,
}

/// Periodic lock-status polling.
pub struct PllSupervisor {
    synthesizer: Arc<dyn Synthesizer>,
    writer: PllWriter,
    reporter: Reporter,
}

impl PllSupervisor {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, writer: PllWriter, reporter: Reporter) -> Self {
        Self {
            synthesizer,
            writer,
            reporter,
        }
    }

    /// Run one poll.
    ///
    /// # Errors
    /// A synthesizer failure other than a timeout.
    pub fn poll(&mut self) -> Result<PllOutcome, TaskError> {
        let state = self.writer.state();
        if !state.rf_enabled() {
            return Ok(PllOutcome::Idle);
        }

        let locked = match self.synthesizer.is_locked() {
            Ok(locked) => locked,
            Err(HalError::Timeout(reason)) => {
                warn!("Lock indicator read timed out: {reason}");
                return Ok(PllOutcome::Unavailable);
            }
            Err(e) => return Err(TaskError::transport("synthesizer")(e)),
        };
        self.writer.set_pll_locked(locked);

        if locked {
            debug!("PLL locked");
            Ok(PllOutcome::Locked)
        } else {
            self.reporter.warning(format_args!(
                "PLL not locked at {} Hz",
                state.target_frequency_hz()
            ));
            Ok(PllOutcome::Unlocked)
        }
    }
}
