//! Cancellation token and start gate.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Instant;

#[derive(Default)]
struct Flag {
    set: Mutex<bool>,
    cond: Condvar,
}

/// Shared stop request observed by every task between iterations.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Flag>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every waiter.
    pub fn cancel(&self) {
        let mut set = self.inner.set.lock();
        *set = true;
        self.inner.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.set.lock()
    }

    /// Sleep until `deadline` or cancellation. Returns `true` if cancelled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut set = self.inner.set.lock();
        while !*set {
            if self.inner.cond.wait_until(&mut set, deadline).timed_out() {
                break;
            }
        }
        *set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Aborted,
}

/// One-shot release of the task threads once all of them exist.
///
/// Unlike a barrier it can be aborted, so a failed spawn never leaves the
/// already-spawned threads waiting forever.
pub struct StartGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl Default for StartGate {
    fn default() -> Self {
        Self {
            state: Mutex::new(GateState::Closed),
            cond: Condvar::new(),
        }
    }
}

impl StartGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release every waiter into its task body.
    pub fn open(&self) {
        self.settle(GateState::Open);
    }

    /// Release every waiter without starting.
    pub fn abort(&self) {
        self.settle(GateState::Aborted);
    }

    /// Block until opened or aborted. Returns `true` if opened.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while *state == GateState::Closed {
            self.cond.wait(&mut state);
        }
        *state == GateState::Open
    }

    fn settle(&self, to: GateState) {
        let mut state = self.state.lock();
        if *state == GateState::Closed {
            *state = to;
        }
        self.cond.notify_all();
    }
}
