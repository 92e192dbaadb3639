//! Integration test: startup, reset, and shutdown ordering.

use super::{T, fast_config, start, start_with_store, wait_for};
use fgen_common::prelude::{CalibrationPoint, CalibrationStore, CalibrationTable, HalError};
use fgen_control_unit::error::CoordinatorError;
use fgen_control_unit::scheduler::{Coordinator, ExitReason};
use fgen_control_unit::state::Writer;
use fgen_hal::drivers::simulation::{FileCalibrationStore, MemoryCalibrationStore, SimulationBoard};
use std::sync::Arc;
use tempfile::tempdir;

fn two_point_table() -> CalibrationTable {
    let mut table = CalibrationTable::new();
    for (hz, db) in [(1_000_000_000, 1), (2_400_000_000, -2)] {
        table.add_point(CalibrationPoint {
            frequency_hz: hz,
            power_correction_db: db,
            temp_coefficient: 0.01,
        });
    }
    table
}

#[test]
fn startup_programs_power_up_settings() {
    let bench = start(fast_config());
    let state = bench.system.state().clone();

    assert_eq!(bench.sim.divider(), Some(96));
    assert_eq!(bench.sim.attenuator_code(), Some(30));
    assert!(!bench.sim.rf_enabled());
    assert!(!bench.sim.status_led());
    assert!(!bench.sim.error_led());

    let snap = state.snapshot();
    assert_eq!(snap.target_frequency_hz.value, 2_400_000_000);
    assert_eq!(snap.target_frequency_hz.writer, Writer::Command);
    assert_eq!(snap.power_dbm.value, 0);
    assert!(!snap.rf_enabled.value);
    assert!(wait_for(T, || state.snapshot().sensors.writer == Writer::Safety));

    bench.stop();
}

#[test]
fn calibration_loaded_at_startup_and_persisted_at_shutdown() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calibration.bin");
    FileCalibrationStore::new(&path)
        .save(&two_point_table())
        .unwrap();

    let mut config = fast_config();
    config.board.calibration_path = Some(path.clone());
    let bench = start(config.clone());
    assert_eq!(bench.system.state().calibration().len(), 2);
    bench.stop();

    // Shutdown wrote the table back.
    let reloaded = FileCalibrationStore::new(&path).load().unwrap();
    assert_eq!(reloaded.points(), two_point_table().points());

    let bench = start(config);
    assert_eq!(bench.ask("CAL:START"), "OK");
    assert_eq!(bench.ask("CAL:SAVE"), "OK");
    bench.stop();
}

#[test]
fn calibration_save_failure_is_reported() {
    let dir = tempdir().unwrap();
    let cal_dir = dir.path().join("cal");
    std::fs::create_dir(&cal_dir).unwrap();
    let mut config = fast_config();
    config.board.calibration_path = Some(cal_dir.join("calibration.bin"));
    let bench = start(config);
    let state = bench.system.state().clone();

    std::fs::remove_dir(&cal_dir).unwrap();
    assert_eq!(bench.ask("CAL:START"), "OK");
    assert_eq!(bench.ask("CAL:SAVE"), "ERROR: Calibration save failed");
    assert!(state.calibrating());

    bench.stop();
}

#[test]
fn reset_replies_ok_then_stops_without_persisting() {
    let store = Arc::new(MemoryCalibrationStore::with_table(two_point_table()));
    let bench = start_with_store(fast_config(), store.clone());

    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");
    bench.host.send_line("SYS:RESET");
    assert_eq!(bench.host.read_reply(T).as_deref(), Some("OK"));

    let reason = bench.system.wait_timeout(T).unwrap();
    assert_eq!(reason, ExitReason::Reset);
    assert_eq!(bench.sim.reset_count(), 1);

    // Commands after the reset are never answered.
    bench.host.send_line("SYS:IDN?");
    assert_eq!(bench.host.read_reply(std::time::Duration::from_millis(100)), None);

    bench.system.shutdown(&reason).unwrap();
    assert!(!bench.sim.rf_enabled());
    assert_eq!(store.save_count(), 0);
}

#[test]
fn closed_input_stops_and_persists() {
    let store = Arc::new(MemoryCalibrationStore::default());
    let bench = start_with_store(fast_config(), store.clone());

    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");
    bench.host.close();
    let reason = bench.system.wait_timeout(T).unwrap();
    assert_eq!(reason, ExitReason::InputClosed);
    let state = bench.system.state().clone();
    bench.system.shutdown(&reason).unwrap();

    assert_eq!(store.save_count(), 1);
    assert!(!bench.sim.rf_enabled());
    assert!(!bench.sim.error_led());
    let snap = state.snapshot();
    assert!(!snap.rf_enabled.value);
    assert_eq!(snap.rf_enabled.writer, Writer::Coordinator);
}

#[test]
fn transport_fault_halts_and_lights_error_led() {
    let bench = start(fast_config());

    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");
    bench
        .host
        .inject_fault(HalError::CommunicationError("framing error".to_string()));

    let reason = bench.system.wait_timeout(T).unwrap();
    let ExitReason::Fault(e) = &reason else {
        panic!("expected a fault, got {reason:?}");
    };
    assert_eq!(e.peripheral, "serial");
    assert!(reason.is_failure());

    bench.system.shutdown(&reason).unwrap();
    assert!(bench.sim.error_led());
    assert!(!bench.sim.rf_enabled());
}

#[test]
fn stop_request_turns_output_off_and_refuses_enable() {
    let bench = start(fast_config());
    let state = bench.system.state().clone();
    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");

    let (host, sim) = bench.stop();
    assert!(!sim.rf_enabled());
    assert!(!state.rf_enabled());
    assert_eq!(state.snapshot().rf_enabled.writer, Writer::Coordinator);

    // Tasks are gone; nothing answers any more.
    host.send_line("RF:OUTPUT ON");
    assert_eq!(host.read_reply(std::time::Duration::from_millis(100)), None);
}

#[test]
fn startup_fails_cleanly_on_driver_init_error() {
    let dir = tempdir().unwrap();
    let mut config = fast_config();
    config.board.calibration_path = Some(dir.path().join("missing").join("cal.bin"));

    let board = SimulationBoard::new(&config);
    let sim = board.handle();
    let (drivers, _host) = board.with_loopback();
    match Coordinator::new(config, drivers).start() {
        Err(CoordinatorError::DriverInit(HalError::InitFailed(_))) => {}
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("start succeeded with a missing calibration directory"),
    }
    assert!(!sim.rf_enabled());
    assert_eq!(sim.divider_writes(), 0);
}
