//! Startup and shutdown ordering.

use super::cancel::{CancelToken, StartGate};
use super::priority::{self, TaskPriority};
use super::{TaskExit, run_periodic};
use crate::error::{CoordinatorError, TaskError};
use crate::pll::PllSupervisor;
use crate::protocol::CommandTask;
use crate::protocol::dispatch::{CommandDrivers, CommandEngine};
use crate::report::{Reporter, SerialOutput};
use crate::safety::supervisor::SafetySupervisor;
use crate::state::{ControlState, ShutdownWriter, Writers};
use fgen_common::config::GeneratorConfig;
use fgen_common::hal::driver::DriverSet;
use fgen_common::hal::types::CalibrationTable;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const COMMAND_TASK: &str = "fgen-command";
const SAFETY_TASK: &str = "fgen-safety";
const PLL_TASK: &str = "fgen-pll";

/// Why the system stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    /// Stop requested through a [`StopHandle`].
    Shutdown,
    /// `SYS:RESET` executed; the board should be rebuilt.
    Reset,
    /// The serial input ended.
    InputClosed,
    /// A task halted on a transport fault.
    Fault(TaskError),
    /// A task body panicked.
    ///
    /// Only reachable in builds that unwind; the release profile aborts on
    /// panic.
    TaskPanicked(&'static str),
}

impl ExitReason {
    /// Whether the stop was caused by a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fault(_) | Self::TaskPanicked(_))
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown requested"),
            Self::Reset => f.write_str("system reset"),
            Self::InputClosed => f.write_str("serial input closed"),
            Self::Fault(e) => write!(f, "fault: {e}"),
            Self::TaskPanicked(task) => write!(f, "{task} task panicked"),
        }
    }
}

enum Signal {
    Stop,
    TaskEnded(&'static str, Result<TaskExit, TaskError>),
    Panicked(&'static str),
}

/// Requests an orderly stop from any thread.
#[derive(Clone)]
pub struct StopHandle {
    tx: Sender<Signal>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        // The receiver is gone only once the system has already stopped.
        let _ = self.tx.send(Signal::Stop);
    }
}

/// Builds and starts the system on one driver set.
pub struct Coordinator {
    config: GeneratorConfig,
    drivers: DriverSet,
}

impl Coordinator {
    pub fn new(config: GeneratorConfig, drivers: DriverSet) -> Self {
        Self { config, drivers }
    }

    /// Initialize drivers, create the state and start every task.
    ///
    /// # Errors
    /// Driver initialization, power-up programming or thread creation
    /// failed. Drivers are released before returning.
    pub fn start(self) -> Result<RunningSystem, CoordinatorError> {
        let Self { config, drivers } = self;

        drivers.init_all()?;

        let table = match drivers.calibration.load() {
            Ok(table) => {
                info!(points = table.len(), "Calibration loaded");
                table
            }
            Err(e) => {
                warn!("Calibration load failed, starting empty: {e}");
                CalibrationTable::new()
            }
        };

        let (
            state,
            Writers {
                command,
                safety,
                pll,
                shutdown,
            },
        ) = ControlState::new(table);
        let output = SerialOutput::new(Arc::clone(&drivers.serial_tx));
        let reporter = Reporter::new(output.clone(), config.protocol.echo_reports);

        let engine = CommandEngine::new(command, CommandDrivers::from(&drivers), &config.device);
        if let Err(e) = engine.apply_power_up_defaults() {
            release(&drivers);
            return Err(CoordinatorError::PowerUp(e));
        }

        let command_task = CommandTask::new(
            engine,
            config.protocol.max_line_len,
            Arc::clone(&drivers.serial_rx),
            output,
            config.timing.serial_poll(),
        );
        let mut safety_supervisor = SafetySupervisor::new(
            &config,
            Arc::clone(&drivers.sensor),
            Arc::clone(&drivers.rf),
            Arc::clone(&drivers.indicator),
            safety,
            reporter.clone(),
        );
        let mut pll_supervisor =
            PllSupervisor::new(Arc::clone(&drivers.synthesizer), pll, reporter);
        let safety_period = config.timing.safety_period();
        let pll_period = config.timing.pll_period();

        let (tx, signals) = mpsc::channel();
        let cancel = CancelToken::new();
        let gate = Arc::new(StartGate::new());
        let mut spawner = Spawner {
            tx: tx.clone(),
            gate: Arc::clone(&gate),
            handles: Vec::with_capacity(3),
        };

        let (c1, c2, c3) = (cancel.clone(), cancel.clone(), cancel.clone());
        let tasks: [(&'static str, TaskPriority, TaskBody); 3] = [
            (
                COMMAND_TASK,
                TaskPriority::High,
                Box::new(move || command_task.run(&c1)),
            ),
            (
                SAFETY_TASK,
                TaskPriority::Middle,
                Box::new(move || {
                    run_periodic(safety_period, &c2, || safety_supervisor.sample().map(drop))
                }),
            ),
            (
                PLL_TASK,
                TaskPriority::Low,
                Box::new(move || run_periodic(pll_period, &c3, || pll_supervisor.poll().map(drop))),
            ),
        ];
        for (name, priority, body) in tasks {
            if let Err(e) = spawner.spawn(name, priority, body) {
                error!("{e}");
                gate.abort();
                for (_, handle) in spawner.handles {
                    let _ = handle.join();
                }
                release(&drivers);
                return Err(e);
            }
        }

        gate.open();
        info!(
            safety_period = ?safety_period,
            pll_period = ?pll_period,
            "Scheduler started"
        );

        Ok(RunningSystem {
            state,
            drivers,
            shutdown,
            cancel,
            signals,
            stop: StopHandle { tx },
            handles: spawner.handles,
        })
    }
}

type TaskBody = Box<dyn FnOnce() -> Result<TaskExit, TaskError> + Send>;

struct Spawner {
    tx: Sender<Signal>,
    gate: Arc<StartGate>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Spawner {
    fn spawn(
        &mut self,
        name: &'static str,
        priority: TaskPriority,
        body: TaskBody,
    ) -> Result<(), CoordinatorError> {
        let tx = self.tx.clone();
        let gate = Arc::clone(&self.gate);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if let Err(e) = priority::apply(priority) {
                    warn!(task = name, "{e}, running with default priority");
                }
                if !gate.wait() {
                    return;
                }
                debug!(task = name, ?priority, "Task started");
                // With `panic = "abort"` a panic ends the process here instead.
                let signal = match panic::catch_unwind(AssertUnwindSafe(body)) {
                    Ok(result) => Signal::TaskEnded(name, result),
                    Err(_) => Signal::Panicked(name),
                };
                let _ = tx.send(signal);
            })
            .map_err(|e| CoordinatorError::Spawn {
                task: name,
                reason: e.to_string(),
            })?;
        self.handles.push((name, handle));
        Ok(())
    }
}

/// A started system.
pub struct RunningSystem {
    state: Arc<ControlState>,
    drivers: DriverSet,
    shutdown: ShutdownWriter,
    cancel: CancelToken,
    signals: Receiver<Signal>,
    stop: StopHandle,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl RunningSystem {
    /// Shared state, for inspection.
    pub fn state(&self) -> &Arc<ControlState> {
        &self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Block until a stop is requested or a task ends.
    pub fn wait(&self) -> ExitReason {
        loop {
            // A sender is held by `self.stop`, so the channel never disconnects.
            let Ok(signal) = self.signals.recv() else {
                return ExitReason::Shutdown;
            };
            if let Some(reason) = classify(signal) {
                return reason;
            }
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ExitReason> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(std::time::Instant::now());
            match self.signals.recv_timeout(left) {
                Ok(signal) => {
                    if let Some(reason) = classify(signal) {
                        return Some(reason);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return Some(ExitReason::Shutdown),
            }
        }
    }

    /// Wait for the exit reason, then shut down.
    ///
    /// # Errors
    /// A task thread panicked outside its body.
    pub fn run(self) -> Result<ExitReason, CoordinatorError> {
        let reason = self.wait();
        self.shutdown(&reason)?;
        Ok(reason)
    }

    /// Stop the system in order: RF off, persist calibration, cancel and
    /// join the tasks, release the drivers.
    ///
    /// Driver failures along the way are logged and do not stop the sequence.
    ///
    /// # Errors
    /// A task thread panicked outside its body.
    pub fn shutdown(self, reason: &ExitReason) -> Result<(), CoordinatorError> {
        info!(%reason, "Shutting down");

        if reason.is_failure() {
            if let Err(e) = self.drivers.indicator.set_error(true) {
                warn!("Error LED not set: {e}");
            }
        }

        let drivers = &self.drivers;
        match self.shutdown.lock_out_rf(|| {
            drivers.rf.set_enabled(false)?;
            drivers.indicator.set_status(false)
        }) {
            Ok(was_on) => info!(was_on, "RF output disabled"),
            Err(e) => error!("RF disable failed at shutdown: {e}"),
        }

        if *reason == ExitReason::Reset {
            debug!("Calibration not persisted across reset");
        } else {
            let table = self.state.calibration();
            match drivers.calibration.save(&table) {
                Ok(()) => info!(points = table.len(), "Calibration persisted"),
                Err(e) => warn!("Calibration persist failed: {e}"),
            }
        }

        self.cancel.cancel();
        let mut panicked = None;
        for (name, handle) in self.handles {
            if handle.join().is_err() {
                error!(task = name, "Task thread panicked");
                panicked.get_or_insert(name);
            } else {
                debug!(task = name, "Task joined");
            }
        }
        while let Ok(signal) = self.signals.try_recv() {
            if let Signal::TaskEnded(name, Err(e)) = signal {
                warn!(task = name, "Task also failed during shutdown: {e}");
            }
        }

        release(drivers);
        info!("Shutdown complete");

        match panicked {
            Some(name) => Err(CoordinatorError::TaskPanicked(name)),
            None => Ok(()),
        }
    }
}

fn classify(signal: Signal) -> Option<ExitReason> {
    match signal {
        Signal::Stop => Some(ExitReason::Shutdown),
        Signal::TaskEnded(_, Ok(TaskExit::Reset)) => Some(ExitReason::Reset),
        Signal::TaskEnded(_, Ok(TaskExit::InputClosed)) => Some(ExitReason::InputClosed),
        Signal::TaskEnded(name, Ok(TaskExit::Cancelled)) => {
            debug!(task = name, "Task ended after cancellation");
            None
        }
        Signal::TaskEnded(name, Err(e)) => {
            error!(task = name, kind = %e.kind(), "Task halted: {e}");
            Some(ExitReason::Fault(e))
        }
        Signal::Panicked(name) => {
            error!(task = name, "Task panicked");
            Some(ExitReason::TaskPanicked(name))
        }
    }
}

fn release(drivers: &DriverSet) {
    if let Err(e) = drivers.shutdown_all() {
        warn!("Driver release failed: {e}");
    }
}
