//! Safety Supervisor.
//!
//! Runs once per safety period:
//! 1. Acquire temperature, voltage and current within the sensor timeout.
//! 2. Classify the temperature.
//! 3. Act on the result:
//!    - Shutdown: force RF off (every sample, not only on entry) and report
//!      FATAL on entry.
//!    - Warning: report on entry, nothing else.
//!    - Normal: nothing.
//!
//! A timed-out acquisition, or one with a non-finite channel, keeps the last
//! good readings and the current thermal state. After `failure_threshold`
//! consecutive failures a warning is reported once per streak; shutdown is
//! never concluded from missing data.

use crate::error::{FaultKind, TaskError};
use crate::report::Reporter;
use crate::safety::thermal::{ThermalStateMachine, ThermalThresholds, ThermalTransition};
use crate::state::SafetyWriter;
use fgen_common::config::GeneratorConfig;
use fgen_common::control::ThermalState;
use fgen_common::hal::driver::{HalError, RfOutput, SensorDriver, StatusIndicator};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of one supervisor period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// Fresh readings were classified.
    Sampled {
        transition: ThermalTransition,
        /// RF output was on and has been forced off by this sample.
        forced_rf_off: bool,
    },
    /// The sensor timed out or returned a non-finite value; last good readings kept.
    SensorUnavailable { consecutive_failures: u32 },
}

/// Periodic sensor sampling and thermal interlock.
pub struct SafetySupervisor {
    sensor: Arc<dyn SensorDriver>,
    rf: Arc<dyn RfOutput>,
    indicator: Arc<dyn StatusIndicator>,
    writer: SafetyWriter,
    reporter: Reporter,
    machine: ThermalStateMachine,
    sensor_timeout: Duration,
    failure_threshold: u32,
    consecutive_failures: u32,
}

impl SafetySupervisor {
    pub fn new(
        config: &GeneratorConfig,
        sensor: Arc<dyn SensorDriver>,
        rf: Arc<dyn RfOutput>,
        indicator: Arc<dyn StatusIndicator>,
        writer: SafetyWriter,
        reporter: Reporter,
    ) -> Self {
        Self {
            sensor,
            rf,
            indicator,
            writer,
            reporter,
            machine: ThermalStateMachine::new(ThermalThresholds::from(&config.thermal)),
            sensor_timeout: config.timing.sensor_timeout(),
            failure_threshold: config.timing.sensor_failure_threshold,
            consecutive_failures: 0,
        }
    }

    /// Consecutive failed acquisitions (timeouts or non-finite readings).
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Run one supervisor period.
    ///
    /// # Errors
    /// A sensor failure other than a timeout, or a failure to switch RF off.
    pub fn sample(&mut self) -> Result<SampleOutcome, TaskError> {
        let readings = match self.sensor.read(self.sensor_timeout) {
            Ok(readings) => readings,
            Err(HalError::Timeout(reason)) => return Ok(self.sensor_unavailable(&reason)),
            Err(e) => return Err(TaskError::transport("sensor")(e)),
        };
        if !readings.is_valid() {
            return Ok(self.sensor_unavailable(&format!("non-finite reading {readings:?}")));
        }
        if self.consecutive_failures > 0 {
            info!(
                failures = self.consecutive_failures,
                "Sensor readings available again"
            );
            self.consecutive_failures = 0;
        }

        self.writer.record_sensors(readings);
        let temperature_c = readings.clamped().temperature_c;
        let transition = self.machine.handle_sample(temperature_c);
        self.writer.set_thermal_state(transition.to);

        let mut forced_rf_off = false;
        match transition.to {
            ThermalState::Shutdown => {
                forced_rf_off = self.force_rf_off()?;
                if transition.entered(ThermalState::Shutdown) {
                    self.reporter
                        .fatal(format_args!("THERMAL SHUTDOWN! Temp={temperature_c:.1}°C"));
                } else if forced_rf_off {
                    warn!(
                        kind = %FaultKind::ThermalShutdown,
                        "RF output re-enabled while overheated, forced off again"
                    );
                }
            }
            ThermalState::Warning if transition.entered(ThermalState::Warning) => {
                self.reporter
                    .warning(format_args!("High temperature: {temperature_c:.1}°C"));
            }
            ThermalState::Normal if transition.from != ThermalState::Normal => {
                info!("Temperature back to normal: {temperature_c:.1}°C");
            }
            _ => {}
        }

        debug!(
            temperature_c,
            voltage_v = readings.voltage_v,
            current_a = readings.current_a,
            state = %transition.to,
            "Safety sample"
        );
        Ok(SampleOutcome::Sampled {
            transition,
            forced_rf_off,
        })
    }

    fn sensor_unavailable(&mut self, reason: &str) -> SampleOutcome {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        debug!(
            kind = %FaultKind::SensorUnavailable,
            failures = self.consecutive_failures,
            "Sensor read failed: {reason}"
        );
        if self.consecutive_failures == self.failure_threshold {
            self.reporter.warning(format_args!(
                "Sensor unavailable: {} consecutive read failures",
                self.consecutive_failures
            ));
        }
        SampleOutcome::SensorUnavailable {
            consecutive_failures: self.consecutive_failures,
        }
    }

    fn force_rf_off(&self) -> Result<bool, TaskError> {
        self.writer.force_rf_off(|| {
            self.rf
                .set_enabled(false)
                .map_err(TaskError::transport("rf"))?;
            self.indicator
                .set_status(false)
                .map_err(TaskError::transport("indicator"))
        })
    }
}
