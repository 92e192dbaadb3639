//! # Frequency Generator Control Unit Library
//!
//! Real-time control and safety supervisor for a microwave frequency
//! synthesizer. Three concurrently scheduled tasks share one [`state::ControlState`]:
//!
//! 1. **Command Protocol Engine** - line-oriented ASCII commands over serial
//! 2. **Safety Supervisor** - periodic sensor sampling and thermal interlock
//! 3. **PLL Supervisor** - periodic lock-status polling
//!
//! ## Single Writer Per Field
//!
//! Every field of the control state carries its own guard and a record of
//! the task that last wrote it. Write access is only available through the
//! writer handles handed out once at construction, so each task can write
//! exactly the fields it owns.
//!
//! ## Fail-Safe Ordering
//!
//! Hardware writes happen while the guard of the mirrored field is held and
//! the field is committed only after the driver call succeeds, so the state
//! never reports a setting the hardware does not have.

pub mod error;
pub mod pll;
pub mod protocol;
pub mod report;
pub mod safety;
pub mod scheduler;
pub mod state;
pub mod translate;
