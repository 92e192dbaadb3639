//! Task Scheduler / Coordinator.
//!
//! ## Startup
//! 1. Initialize every driver in order.
//! 2. Load the calibration table (empty on failure).
//! 3. Create `ControlState` and program the power-up frequency and power.
//! 4. Spawn `fgen-command` (High), `fgen-safety` (Middle) and `fgen-pll` (Low).
//! 5. Open the start gate.
//!
//! ## Shutdown
//! 1. Lock RF output out and switch it off.
//! 2. Persist calibration (skipped after a reset).
//! 3. Cancel every task and join it.
//! 4. Release the drivers in reverse order.

pub mod cancel;
pub mod coordinator;
pub mod priority;

pub use cancel::{CancelToken, StartGate};
pub use coordinator::{Coordinator, ExitReason, RunningSystem, StopHandle};
pub use priority::TaskPriority;

use crate::error::TaskError;
use std::time::{Duration, Instant};
use tracing::debug;

/// How a task body ended without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    /// Cancelled by the coordinator.
    Cancelled,
    /// `SYS:RESET` was executed.
    Reset,
    /// The serial input reached end of stream.
    InputClosed,
}

/// Call `tick` once per `period` until cancelled or `tick` fails.
///
/// The first tick runs immediately. Wake-ups follow absolute deadlines; after
/// an overrun the schedule restarts from the current time instead of
/// bursting to catch up.
pub fn run_periodic<F>(
    period: Duration,
    cancel: &CancelToken,
    mut tick: F,
) -> Result<TaskExit, TaskError>
where
    F: FnMut() -> Result<(), TaskError>,
{
    let mut next_wake = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return Ok(TaskExit::Cancelled);
        }
        tick()?;

        next_wake += period;
        let now = Instant::now();
        if next_wake < now {
            debug!(late_by = ?(now - next_wake), "Period overrun");
            next_wake = now;
        }
        if cancel.wait_until(next_wake) {
            return Ok(TaskExit::Cancelled);
        }
    }
}
