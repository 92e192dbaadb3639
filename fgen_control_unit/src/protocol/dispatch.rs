//! Command dispatch.
//!
//! Setters validate through the translator before touching anything. A
//! valid request drives the hardware while holding the mirrored field's
//! guard and commits the field only once the driver accepted it.

use crate::error::{FaultKind, TaskError};
use crate::protocol::command::Command;
use crate::protocol::response::Response;
use crate::state::{CommandWriter, ControlState, RfRequest};
use crate::translate::{corrected_power, dbm_to_attenuator_code, hz_to_divider};
use fgen_common::config::DeviceConfig;
use fgen_common::consts::{DEFAULT_FREQUENCY_HZ, DEFAULT_POWER_DBM, IDN_MANUFACTURER};
use fgen_common::hal::driver::{
    Attenuator, CalibrationStore, DriverSet, RfOutput, StatusIndicator, Synthesizer, SystemReset,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the command task does after sending the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Read the next command.
    Continue,
    /// Reset the system; no further commands are read.
    Reset,
}

/// Reply and follow-up of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub response: Response,
    pub outcome: DispatchOutcome,
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self {
            response,
            outcome: DispatchOutcome::Continue,
        }
    }
}

/// Drivers the command engine acts on.
#[derive(Clone)]
pub struct CommandDrivers {
    pub synthesizer: Arc<dyn Synthesizer>,
    pub rf: Arc<dyn RfOutput>,
    pub attenuator: Arc<dyn Attenuator>,
    pub indicator: Arc<dyn StatusIndicator>,
    pub calibration: Arc<dyn CalibrationStore>,
    pub reset: Arc<dyn SystemReset>,
}

impl From<&DriverSet> for CommandDrivers {
    fn from(drivers: &DriverSet) -> Self {
        Self {
            synthesizer: Arc::clone(&drivers.synthesizer),
            rf: Arc::clone(&drivers.rf),
            attenuator: Arc::clone(&drivers.attenuator),
            indicator: Arc::clone(&drivers.indicator),
            calibration: Arc::clone(&drivers.calibration),
            reset: Arc::clone(&drivers.reset),
        }
    }
}

/// Executes parsed commands against the control state and drivers.
pub struct CommandEngine {
    writer: CommandWriter,
    drivers: CommandDrivers,
    identity: String,
}

impl CommandEngine {
    pub fn new(writer: CommandWriter, drivers: CommandDrivers, device: &DeviceConfig) -> Self {
        Self {
            writer,
            drivers,
            identity: format!(
                "{IDN_MANUFACTURER},{},{},{}",
                device.model, device.serial, device.version
            ),
        }
    }

    /// Shared state.
    pub fn state(&self) -> &Arc<ControlState> {
        self.writer.state()
    }

    /// Program the power-up frequency and power, RF off.
    ///
    /// # Errors
    /// A driver failure.
    pub fn apply_power_up_defaults(&self) -> Result<(), TaskError> {
        self.set_output(false)?;
        self.set_frequency(DEFAULT_FREQUENCY_HZ)?;
        self.set_power(DEFAULT_POWER_DBM)?;
        info!(
            frequency_hz = DEFAULT_FREQUENCY_HZ,
            power_dbm = DEFAULT_POWER_DBM,
            "Power-up settings programmed"
        );
        Ok(())
    }

    /// Parse and execute one line.
    pub fn handle_line(&self, line: &str) -> Result<Reply, TaskError> {
        self.dispatch(&Command::parse(line))
    }

    /// Execute one command.
    ///
    /// # Errors
    /// A driver failure. Every operator error is answered with a reply.
    pub fn dispatch(&self, command: &Command) -> Result<Reply, TaskError> {
        let state = self.state();
        let response = match command {
            Command::Identify => Response::Identity(self.identity.clone()),
            Command::Reset => {
                return Ok(Reply {
                    response: Response::Ok,
                    outcome: DispatchOutcome::Reset,
                });
            }
            Command::Status => Response::Status(state.sensors()),
            Command::SetFrequency(hz) => self.set_frequency(*hz)?,
            Command::GetFrequency => Response::Frequency(state.target_frequency_hz()),
            Command::SetPower(dbm) => self.set_power(*dbm)?,
            Command::GetPower => Response::Power(state.power_dbm()),
            Command::SetOutput(on) => self.set_output(*on)?,
            Command::GetOutput => Response::Output(state.rf_enabled()),
            Command::ProgramRun => {
                self.writer.set_program_running(true);
                Response::Ok
            }
            Command::ProgramStop => {
                self.writer.set_program_running(false);
                Response::Ok
            }
            Command::CalibrationStart => {
                self.writer.set_calibrating(true);
                info!("Calibration session started");
                Response::Ok
            }
            Command::CalibrationSave => self.save_calibration(),
            Command::Unknown(line) => {
                debug!(kind = %FaultKind::UnknownCommand, %line, "Unknown command");
                Response::UnknownCommand
            }
        };
        Ok(response.into())
    }

    /// Pull the reset line after the reply to `SYS:RESET` went out.
    pub fn perform_reset(&self) -> Result<(), TaskError> {
        info!("Performing system reset");
        self.drivers
            .reset
            .reset()
            .map_err(TaskError::transport("reset"))
    }

    fn set_frequency(&self, hz: u64) -> Result<Response, TaskError> {
        let divider = match hz_to_divider(hz) {
            Ok(divider) => divider,
            Err(e) => {
                info!(kind = %FaultKind::OutOfRange, "Rejected: {e}");
                return Ok(Response::FrequencyOutOfRange);
            }
        };
        self.writer.set_frequency(hz, |_| {
            self.drivers
                .synthesizer
                .set_divider(divider)
                .map_err(TaskError::transport("synthesizer"))
        })?;
        debug!(frequency_hz = hz, divider, "Frequency set");

        // The power correction depends on frequency; rewrite the attenuator.
        let power_dbm = self.state().power_dbm();
        if self.set_power(power_dbm)? != Response::Ok {
            warn!(power_dbm, frequency_hz = hz, "Power not reachable after correction");
        }
        Ok(Response::Ok)
    }

    fn set_power(&self, dbm: i8) -> Result<Response, TaskError> {
        if let Err(e) = dbm_to_attenuator_code(dbm) {
            info!(kind = %FaultKind::OutOfRange, "Rejected: {e}");
            return Ok(Response::PowerOutOfRange);
        }
        let state = self.state();
        let correction = state.power_correction(state.target_frequency_hz());
        let effective = corrected_power(dbm, correction);
        let code = match dbm_to_attenuator_code(effective) {
            Ok(code) => code,
            Err(_) => return Ok(Response::PowerOutOfRange),
        };
        self.writer.set_power(dbm, |_| {
            self.drivers
                .attenuator
                .write_code(code)
                .map_err(TaskError::transport("attenuator"))
        })?;
        debug!(power_dbm = dbm, correction, code, "Power set");
        Ok(Response::Ok)
    }

    fn set_output(&self, on: bool) -> Result<Response, TaskError> {
        let request = self.writer.set_rf_enabled(on, |on| {
            self.drivers
                .rf
                .set_enabled(on)
                .map_err(TaskError::transport("rf"))?;
            self.drivers
                .indicator
                .set_status(on)
                .map_err(TaskError::transport("indicator"))
        })?;
        match request {
            RfRequest::Applied => {
                info!(enabled = on, "RF output switched");
                Ok(Response::Ok)
            }
            RfRequest::Interlocked => {
                warn!(kind = %FaultKind::ThermalShutdown, "RF enable refused");
                Ok(Response::ThermalInterlock)
            }
        }
    }

    fn save_calibration(&self) -> Response {
        let table = self.state().calibration();
        match self.drivers.calibration.save(&table) {
            Ok(()) => {
                self.writer.set_calibrating(false);
                info!(points = table.len(), "Calibration saved");
                Response::Ok
            }
            Err(e) => {
                warn!("Calibration save failed: {e}");
                Response::CalibrationSaveFailed
            }
        }
    }
}
