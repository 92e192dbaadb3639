//! Integration test: thermal interlock under the running scheduler.

use super::{T, fast_config, start, wait_for};
use fgen_common::control::ThermalState;
use fgen_control_unit::state::Writer;

#[test]
fn overheat_forces_output_off_and_blocks_reenable() {
    let bench = start(fast_config());
    let state = bench.system.state().clone();

    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");
    bench.sim.force_temperature(Some(90.0));

    assert!(wait_for(T, || !state.rf_enabled()));
    assert!(!bench.sim.rf_enabled());
    assert!(!bench.sim.status_led());
    assert_eq!(state.thermal_state(), ThermalState::Shutdown);
    assert_eq!(state.snapshot().rf_enabled.writer, Writer::Safety);
    assert!(wait_for(T, || {
        bench
            .host
            .reports()
            .contains(&"[FATAL] THERMAL SHUTDOWN! Temp=90.0°C".to_string())
    }));

    assert_eq!(bench.ask("RF:OUTPUT ON"), "ERROR: Thermal shutdown active");
    assert_eq!(bench.ask("RF:OUTPUT?"), "OFF");

    // Still overheated: the fatal report is not repeated.
    std::thread::sleep(std::time::Duration::from_millis(100));
    let fatal = bench
        .host
        .reports()
        .iter()
        .filter(|r| r.starts_with("[FATAL]"))
        .count();
    assert_eq!(fatal, 1);

    bench.sim.force_temperature(Some(60.0));
    assert!(wait_for(T, || state.thermal_state() == ThermalState::Normal));
    // No automatic recovery.
    assert!(!state.rf_enabled());
    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");
    assert!(bench.sim.rf_enabled());

    bench.stop();
}

#[test]
fn warning_band_reports_without_touching_output() {
    let bench = start(fast_config());
    let state = bench.system.state().clone();

    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");
    bench.sim.force_temperature(Some(75.0));
    assert!(wait_for(T, || state.thermal_state() == ThermalState::Warning));
    assert!(wait_for(T, || {
        bench
            .host
            .reports()
            .contains(&"[WARNING] High temperature: 75.0°C".to_string())
    }));
    assert!(state.rf_enabled());

    bench.sim.force_temperature(Some(69.9));
    assert!(wait_for(T, || state.thermal_state() == ThermalState::Normal));
    assert!(state.rf_enabled());
    assert_eq!(state.snapshot().rf_enabled.writer, Writer::Command);

    bench.stop();
}

#[test]
fn sensor_outage_escalates_but_never_shuts_down() {
    let bench = start(fast_config());
    let state = bench.system.state().clone();

    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");
    bench.sim.fail_sensor_reads(5);
    assert!(wait_for(T, || {
        bench
            .host
            .reports()
            .contains(&"[WARNING] Sensor unavailable: 3 consecutive read failures".to_string())
    }));
    assert!(state.rf_enabled());
    assert_eq!(state.thermal_state(), ThermalState::Normal);

    bench.stop();
}

#[test]
fn silent_reports_when_echo_disabled() {
    let mut config = fast_config();
    config.protocol.echo_reports = false;
    let bench = start(config);
    let state = bench.system.state().clone();

    bench.sim.force_temperature(Some(88.0));
    assert!(wait_for(T, || state.thermal_state() == ThermalState::Shutdown));
    assert_eq!(bench.ask("RF:OUTPUT?"), "OFF");
    assert!(bench.host.reports().is_empty());

    bench.stop();
}
