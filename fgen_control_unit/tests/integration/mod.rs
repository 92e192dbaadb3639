//! Integration test modules and the shared bench.

mod concurrency;
mod lifecycle;
mod protocol_session;
mod thermal_interlock;

use fgen_common::prelude::{CalibrationStore, GeneratorConfig};
use fgen_control_unit::scheduler::{Coordinator, RunningSystem};
use fgen_hal::drivers::simulation::{LoopbackHost, SimHandle, SimulationBoard};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Generous upper bound for anything the system should do "soon".
pub const T: Duration = Duration::from_secs(3);

/// A running system with its test handles.
pub struct Bench {
    pub system: RunningSystem,
    pub host: LoopbackHost,
    pub sim: SimHandle,
}

impl Bench {
    /// Send one command and return its single reply line.
    pub fn ask(&self, line: &str) -> String {
        self.host
            .query(line, 1, T)
            .pop()
            .unwrap_or_else(|| panic!("no reply to {line:?}"))
    }

    /// Request a stop and shut down.
    pub fn stop(self) -> (LoopbackHost, SimHandle) {
        self.system.stop_handle().request_stop();
        let reason = self.system.wait_timeout(T).expect("stop observed");
        self.system.shutdown(&reason).unwrap();
        (self.host, self.sim)
    }
}

/// Defaults with short periods so tests observe several ticks quickly.
pub fn fast_config() -> GeneratorConfig {
    let mut config = GeneratorConfig::default();
    config.timing.safety_period_ms = 20;
    config.timing.pll_period_ms = 20;
    config.timing.sensor_timeout_ms = 10;
    config.timing.serial_poll_ms = 5;
    config.simulation.lock_delay_ms = 0;
    config
}

pub fn start(config: GeneratorConfig) -> Bench {
    start_on(SimulationBoard::new(&config), config)
}

pub fn start_with_store(config: GeneratorConfig, store: Arc<dyn CalibrationStore>) -> Bench {
    start_on(
        SimulationBoard::new(&config).with_calibration_store(store),
        config,
    )
}

fn start_on(board: SimulationBoard, config: GeneratorConfig) -> Bench {
    let sim = board.handle();
    let (drivers, host) = board.with_loopback();
    let system = Coordinator::new(config, drivers).start().unwrap();
    Bench { system, host, sim }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}
