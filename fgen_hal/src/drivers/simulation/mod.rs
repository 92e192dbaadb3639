//! Simulation board.
//!
//! Software emulation of the generator hardware for development and testing:
//! a thermal and supply model behind the sensors, a synthesizer with a delayed
//! lock indicator, the RF switch, attenuator, LEDs and reset line, plus console
//! and loopback serial transports.

mod driver;
mod serial;
mod storage;
mod thermal;

pub use driver::{
    SimAttenuator, SimHandle, SimIndicator, SimReset, SimRfSwitch, SimSensor, SimSynthesizer,
    SimulationBoard,
};
pub use serial::{LoopbackHost, LoopbackPort, StdinRx, StdoutTx, loopback};
pub use storage::{FileCalibrationStore, MemoryCalibrationStore, PersistedCalibration};
pub use thermal::ThermalModel;

use fgen_common::config::GeneratorConfig;
use fgen_common::hal::driver::{DriverSet, HalError};

/// Factory function creating the simulation board on the process console.
pub fn create_board(config: &GeneratorConfig) -> Result<DriverSet, HalError> {
    Ok(SimulationBoard::new(config).with_stdio())
}
