//! Shared control state.
//!
//! One `ControlState` is created at startup and shared by every task. Each
//! field sits behind its own guard together with a provenance stamp naming the
//! writer of the current value and a per-field sequence number.
//!
//! Reads are open to everyone. Writes go through the handles returned by
//! [`ControlState::new`], one per task, each exposing only that task's fields:
//!
//! | Field | Writers |
//! |-------|---------|
//! | `target_frequency_hz`, `power_dbm` | Command |
//! | `rf_enabled` | Command, Safety (interlock), Coordinator (shutdown) |
//! | `program_running`, `calibrating`, calibration table | Command |
//! | `pll_locked` | Pll |
//! | sensor readings, `thermal_state` | Safety |

use fgen_common::consts::{DEFAULT_FREQUENCY_HZ, DEFAULT_POWER_DBM};
use fgen_common::control::ThermalState;
use fgen_common::hal::types::{CalibrationTable, SensorReadings};
use parking_lot::{Mutex, MutexGuard};
use static_assertions::assert_impl_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Task that produced a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Writer {
    /// Power-up value.
    Init,
    /// Command Protocol Engine.
    Command,
    /// Safety Supervisor.
    Safety,
    /// PLL Supervisor.
    Pll,
    /// Coordinator during shutdown.
    Coordinator,
}

/// A field value with its provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamped<T> {
    /// Current value.
    pub value: T,
    /// Writer of `value`.
    pub writer: Writer,
    /// Number of writes to this field so far.
    pub seq: u64,
}

struct Field<T: Copy> {
    slot: Mutex<Stamped<T>>,
}

impl<T: Copy> Field<T> {
    fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Stamped {
                value,
                writer: Writer::Init,
                seq: 0,
            }),
        }
    }

    #[inline]
    fn get(&self) -> T {
        self.slot.lock().value
    }

    #[inline]
    fn stamped(&self) -> Stamped<T> {
        *self.slot.lock()
    }

    fn set(&self, value: T, writer: Writer) {
        commit(&mut self.slot.lock(), value, writer);
    }

    /// Run `hw` with the guard held and commit `value` only if it succeeds.
    fn apply<E>(
        &self,
        value: T,
        writer: Writer,
        hw: impl FnOnce(T) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut slot = self.slot.lock();
        hw(value)?;
        commit(&mut slot, value, writer);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Stamped<T>> {
        self.slot.lock()
    }
}

fn commit<T: Copy>(slot: &mut Stamped<T>, value: T, writer: Writer) {
    slot.value = value;
    slot.writer = writer;
    slot.seq += 1;
}

/// Result of a request to enable RF output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfRequest {
    /// Output set as requested.
    Applied,
    /// Refused: thermal shutdown active or system stopping.
    Interlocked,
}

/// Single source of truth for the generator settings and measurements.
pub struct ControlState {
    target_frequency_hz: Field<u64>,
    power_dbm: Field<i8>,
    rf_enabled: Field<bool>,
    pll_locked: Field<bool>,
    sensors: Field<SensorReadings>,
    thermal_state: Field<ThermalState>,
    program_running: Field<bool>,
    calibrating: Field<bool>,
    calibration: Mutex<CalibrationTable>,
    // Set once by the coordinator; checked under the rf_enabled guard.
    rf_locked_out: AtomicBool,
}

assert_impl_all!(ControlState: Send, Sync);

/// Point-in-time copy of every field with provenance.
///
/// Fields are read one after another, each under its own guard; the copy is
/// not atomic across fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    pub target_frequency_hz: Stamped<u64>,
    pub power_dbm: Stamped<i8>,
    pub rf_enabled: Stamped<bool>,
    pub pll_locked: Stamped<bool>,
    pub sensors: Stamped<SensorReadings>,
    pub thermal_state: Stamped<ThermalState>,
    pub program_running: Stamped<bool>,
    pub calibrating: Stamped<bool>,
}

/// The write handles of one `ControlState`.
pub struct Writers {
    pub command: CommandWriter,
    pub safety: SafetyWriter,
    pub pll: PllWriter,
    pub shutdown: ShutdownWriter,
}

impl ControlState {
    /// Create the state with power-up values and its write handles.
    pub fn new(calibration: CalibrationTable) -> (Arc<Self>, Writers) {
        let state = Arc::new(Self {
            target_frequency_hz: Field::new(DEFAULT_FREQUENCY_HZ),
            power_dbm: Field::new(DEFAULT_POWER_DBM),
            rf_enabled: Field::new(false),
            pll_locked: Field::new(false),
            sensors: Field::new(SensorReadings::default()),
            thermal_state: Field::new(ThermalState::Normal),
            program_running: Field::new(false),
            calibrating: Field::new(false),
            calibration: Mutex::new(calibration),
            rf_locked_out: AtomicBool::new(false),
        });
        let writers = Writers {
            command: CommandWriter {
                state: Arc::clone(&state),
            },
            safety: SafetyWriter {
                state: Arc::clone(&state),
            },
            pll: PllWriter {
                state: Arc::clone(&state),
            },
            shutdown: ShutdownWriter {
                state: Arc::clone(&state),
            },
        };
        (state, writers)
    }

    // ─── Reads ──────────────────────────────────────────────────────

    pub fn target_frequency_hz(&self) -> u64 {
        self.target_frequency_hz.get()
    }

    pub fn power_dbm(&self) -> i8 {
        self.power_dbm.get()
    }

    pub fn rf_enabled(&self) -> bool {
        self.rf_enabled.get()
    }

    pub fn pll_locked(&self) -> bool {
        self.pll_locked.get()
    }

    /// Last good sensor readings.
    pub fn sensors(&self) -> SensorReadings {
        self.sensors.get()
    }

    pub fn thermal_state(&self) -> ThermalState {
        self.thermal_state.get()
    }

    pub fn program_running(&self) -> bool {
        self.program_running.get()
    }

    pub fn calibrating(&self) -> bool {
        self.calibrating.get()
    }

    /// Copy of the calibration table.
    pub fn calibration(&self) -> CalibrationTable {
        self.calibration.lock().clone()
    }

    /// Power correction for `frequency_hz` from the calibration table.
    pub fn power_correction(&self, frequency_hz: u64) -> i8 {
        self.calibration.lock().correction_for(frequency_hz)
    }

    /// Every field with its provenance.
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            target_frequency_hz: self.target_frequency_hz.stamped(),
            power_dbm: self.power_dbm.stamped(),
            rf_enabled: self.rf_enabled.stamped(),
            pll_locked: self.pll_locked.stamped(),
            sensors: self.sensors.stamped(),
            thermal_state: self.thermal_state.stamped(),
            program_running: self.program_running.stamped(),
            calibrating: self.calibrating.stamped(),
        }
    }
}

// ─── Writer handles ─────────────────────────────────────────────────

/// Write access of the Command Protocol Engine.
pub struct CommandWriter {
    state: Arc<ControlState>,
}

impl CommandWriter {
    /// Program the synthesizer through `hw` and commit the new target.
    pub fn set_frequency<E>(
        &self,
        hz: u64,
        hw: impl FnOnce(u64) -> Result<(), E>,
    ) -> Result<(), E> {
        self.state.target_frequency_hz.apply(hz, Writer::Command, hw)
    }

    /// Program the attenuator through `hw` and commit the new power.
    pub fn set_power<E>(&self, dbm: i8, hw: impl FnOnce(i8) -> Result<(), E>) -> Result<(), E> {
        self.state.power_dbm.apply(dbm, Writer::Command, hw)
    }

    /// Switch RF output through `hw` and commit the new flag.
    ///
    /// Enabling is refused while the thermal state is `Shutdown` or after the
    /// coordinator has locked RF out. Disabling always goes through.
    pub fn set_rf_enabled<E>(
        &self,
        enabled: bool,
        hw: impl FnOnce(bool) -> Result<(), E>,
    ) -> Result<RfRequest, E> {
        let mut slot = self.state.rf_enabled.lock();
        if enabled
            && (self.state.rf_locked_out.load(Ordering::Acquire)
                || self.state.thermal_state().blocks_rf())
        {
            return Ok(RfRequest::Interlocked);
        }
        hw(enabled)?;
        commit(&mut slot, enabled, Writer::Command);
        Ok(RfRequest::Applied)
    }

    pub fn set_program_running(&self, running: bool) {
        self.state.program_running.set(running, Writer::Command);
    }

    pub fn set_calibrating(&self, active: bool) {
        self.state.calibrating.set(active, Writer::Command);
    }

    /// Run `f` on the calibration table while holding its guard.
    pub fn with_calibration<R>(&self, f: impl FnOnce(&mut CalibrationTable) -> R) -> R {
        f(&mut self.state.calibration.lock())
    }

    /// Shared state.
    pub fn state(&self) -> &Arc<ControlState> {
        &self.state
    }
}

/// Write access of the Safety Supervisor.
pub struct SafetyWriter {
    state: Arc<ControlState>,
}

impl SafetyWriter {
    /// Store a successful acquisition, clamped to the sensor ranges.
    pub fn record_sensors(&self, readings: SensorReadings) {
        self.state.sensors.set(readings.clamped(), Writer::Safety);
    }

    /// Store the classification of the latest sample.
    pub fn set_thermal_state(&self, thermal: ThermalState) {
        self.state.thermal_state.set(thermal, Writer::Safety);
    }

    /// Force RF output off through `hw`. Returns whether it was on.
    pub fn force_rf_off<E>(&self, hw: impl FnOnce() -> Result<(), E>) -> Result<bool, E> {
        force_rf_off(&self.state, Writer::Safety, hw)
    }

    /// Shared state.
    pub fn state(&self) -> &Arc<ControlState> {
        &self.state
    }
}

/// Write access of the PLL Supervisor.
pub struct PllWriter {
    state: Arc<ControlState>,
}

impl PllWriter {
    pub fn set_pll_locked(&self, locked: bool) {
        self.state.pll_locked.set(locked, Writer::Pll);
    }

    /// Shared state.
    pub fn state(&self) -> &Arc<ControlState> {
        &self.state
    }
}

/// Write access of the coordinator at shutdown.
pub struct ShutdownWriter {
    state: Arc<ControlState>,
}

impl ShutdownWriter {
    /// Force RF output off and refuse every later enable.
    ///
    /// The lock-out holds even if `hw` fails.
    pub fn lock_out_rf<E>(&self, hw: impl FnOnce() -> Result<(), E>) -> Result<bool, E> {
        self.state.rf_locked_out.store(true, Ordering::Release);
        force_rf_off(&self.state, Writer::Coordinator, hw)
    }
}

fn force_rf_off<E>(
    state: &ControlState,
    writer: Writer,
    hw: impl FnOnce() -> Result<(), E>,
) -> Result<bool, E> {
    let mut slot = state.rf_enabled.lock();
    let was_on = slot.value;
    hw()?;
    if was_on {
        commit(&mut slot, false, writer);
    }
    Ok(was_on)
}
