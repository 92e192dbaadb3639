//! Integration test: operator session over the serial link.

use super::{T, fast_config, start, wait_for};
use fgen_control_unit::state::Writer;

#[test]
fn identify_and_frequency_round_trip() {
    let bench = start(fast_config());

    assert_eq!(
        bench.ask("SYS:IDN?"),
        "FrequencyGenerator,FG-STM32H743,SN123456,1.0.0"
    );
    assert_eq!(bench.ask("RF:FREQ 2400000000"), "OK");
    assert_eq!(bench.ask("RF:FREQ?"), "2400000000");
    assert_eq!(bench.ask("RF:FREQ 10000000"), "OK");
    assert_eq!(bench.ask("RF:FREQ?"), "10000000");
    assert_eq!(bench.sim.divider(), Some(0));

    bench.stop();
}

#[test]
fn out_of_range_setters_reply_with_hint_and_keep_state() {
    let bench = start(fast_config());

    assert_eq!(
        bench.host.query("RF:FREQ 9999999", 2, T),
        ["ERROR: Frequency out of range", "Valid range: 10 MHz - 6 GHz"]
    );
    assert_eq!(
        bench.host.query("RF:POWER 16", 2, T),
        ["ERROR: Power out of range", "Valid range: -20 to +15 dBm"]
    );
    assert_eq!(bench.ask("RF:FREQ?"), "2400000000");
    assert_eq!(bench.ask("RF:POWER?"), "0");

    bench.stop();
}

#[test]
fn power_and_output_commands() {
    let bench = start(fast_config());

    assert_eq!(bench.ask("RF:POWER -10"), "OK");
    assert_eq!(bench.ask("RF:POWER?"), "-10");
    assert_eq!(bench.sim.attenuator_code(), Some(50));

    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");
    assert_eq!(bench.ask("RF:OUTPUT ON"), "OK");
    assert_eq!(bench.ask("RF:OUTPUT?"), "ON");
    assert!(bench.sim.rf_enabled());
    assert!(bench.sim.status_led());

    assert_eq!(bench.ask("RF:OUTPUT OFF"), "OK");
    assert_eq!(bench.ask("RF:OUTPUT?"), "OFF");
    assert!(!bench.sim.rf_enabled());

    bench.stop();
}

#[test]
fn framing_drops_blank_lines_and_leading_whitespace() {
    let bench = start(fast_config());

    bench.host.send(b"\r\n\n  \tRF:POWER?\r");
    assert_eq!(bench.host.read_reply(T).as_deref(), Some("0"));
    bench.host.send(b"\n\n\r");
    assert_eq!(bench.ask("RF:OUTPUT?"), "OFF");

    bench.stop();
}

#[test]
fn unknown_command_leaves_state_alone() {
    let bench = start(fast_config());
    let state = bench.system.state().clone();

    let before = state.snapshot();
    assert_eq!(bench.ask("FOO:BAR"), "ERROR: Unknown command");
    assert_eq!(bench.ask("rf:freq?"), "ERROR: Unknown command");
    let after = state.snapshot();
    assert_eq!(after.target_frequency_hz, before.target_frequency_hz);
    assert_eq!(after.power_dbm, before.power_dbm);
    assert_eq!(after.rf_enabled, before.rf_enabled);

    bench.stop();
}

#[test]
fn status_reports_latest_sample() {
    let bench = start(fast_config());
    let state = bench.system.state().clone();

    bench.sim.force_temperature(Some(31.0));
    assert!(wait_for(T, || state.sensors().temperature_c == 31.0));
    assert!(bench.ask("SYS:STAT?").starts_with("TEMP:31.0,VOLT:"));
    assert_eq!(state.snapshot().sensors.writer, Writer::Safety);

    bench.stop();
}

#[test]
fn program_and_calibration_flags() {
    let bench = start(fast_config());
    let state = bench.system.state().clone();

    assert_eq!(bench.ask("PROG:RUN"), "OK");
    assert!(state.program_running());
    assert_eq!(bench.ask("PROG:STOP"), "OK");
    assert!(!state.program_running());

    assert_eq!(bench.ask("CAL:START"), "OK");
    assert!(state.calibrating());
    assert_eq!(bench.ask("CAL:SAVE"), "OK");
    assert!(!state.calibrating());

    bench.stop();
}
