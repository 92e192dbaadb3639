//! Task priorities.
//!
//! With the `rt` feature each task thread switches itself to `SCHED_FIFO`;
//! without it the priority is only recorded and logged.

use thiserror::Error;

/// `SCHED_FIFO` priority of the lowest task.
pub const RT_PRIORITY_BASE: i32 = 40;

/// Relative urgency of a task. Ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    /// PLL Supervisor.
    Low,
    /// Safety Supervisor.
    Middle,
    /// Command Protocol Engine.
    High,
}

impl TaskPriority {
    /// `SCHED_FIFO` priority used with the `rt` feature.
    pub const fn rt_priority(self) -> i32 {
        RT_PRIORITY_BASE
            + match self {
                Self::Low => 1,
                Self::Middle => 2,
                Self::High => 3,
            }
    }
}

/// Failure to switch the calling thread's scheduling policy.
#[derive(Debug, Error)]
#[error("sched_setscheduler(SCHED_FIFO, {priority}) failed: {source}")]
pub struct PriorityError {
    pub priority: i32,
    #[source]
    pub source: std::io::Error,
}

/// Apply `priority` to the calling thread.
///
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
pub fn apply(priority: TaskPriority) -> Result<(), PriorityError> {
    let param = libc::sched_param {
        sched_priority: priority.rt_priority(),
    };
    // SAFETY: pid 0 targets the calling thread; `param` outlives the call.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        return Err(PriorityError {
            priority: param.sched_priority,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
pub fn apply(_priority: TaskPriority) -> Result<(), PriorityError> {
    Ok(()) // No-op in simulation mode
}
