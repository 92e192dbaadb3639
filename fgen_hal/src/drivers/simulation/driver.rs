//! Simulated board peripherals.
//!
//! Every peripheral shares one `Hardware` model behind a mutex, so the RF
//! switch, the attenuator and the thermal model see a consistent board.
//! [`SimHandle`] exposes the same model for inspection and fault injection.

use super::serial::{LoopbackHost, StdinRx, StdoutTx, loopback};
use super::storage::{FileCalibrationStore, MemoryCalibrationStore};
use super::thermal::{ThermalModel, power_fraction, supply};
use fgen_common::config::{GeneratorConfig, SimulationConfig};
use fgen_common::hal::driver::{
    Attenuator, CalibrationStore, DriverSet, HalError, Peripheral, RfOutput, SensorDriver,
    SerialRx, SerialTx, StatusIndicator, Synthesizer, SystemReset,
};
use fgen_common::hal::types::SensorReadings;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ─── Hardware model ─────────────────────────────────────────────────

struct Hardware {
    config: SimulationConfig,
    thermal: ThermalModel,
    divider: Option<u32>,
    divider_written_at: Option<Instant>,
    divider_writes: u32,
    rf_enabled: bool,
    attenuator_code: Option<u8>,
    status_led: bool,
    error_led: bool,
    reset_count: u32,
    sensor_reads: u32,
    // Fault injection
    forced_temperature: Option<f64>,
    failing_sensor_reads: u32,
    pll_fault: bool,
}

impl Hardware {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            config: config.clone(),
            thermal: ThermalModel::new(config, Instant::now()),
            divider: None,
            divider_written_at: None,
            divider_writes: 0,
            rf_enabled: false,
            attenuator_code: None,
            status_led: false,
            error_led: false,
            reset_count: 0,
            sensor_reads: 0,
            forced_temperature: None,
            failing_sensor_reads: 0,
            pll_fault: false,
        }
    }

    fn power_fraction(&self) -> f64 {
        power_fraction(self.rf_enabled, self.attenuator_code.unwrap_or(u8::MAX))
    }

    fn sample(&mut self) -> SensorReadings {
        let fraction = self.power_fraction();
        let modelled = self.thermal.advance(Instant::now(), fraction);
        let (voltage, current) = supply(&self.config, fraction);
        SensorReadings::new(
            self.forced_temperature.unwrap_or(modelled),
            voltage,
            current,
        )
    }

    fn is_locked(&self) -> bool {
        if self.pll_fault {
            return false;
        }
        let lock_delay = Duration::from_millis(self.config.lock_delay_ms);
        self.divider_written_at
            .is_some_and(|at| at.elapsed() >= lock_delay)
    }
}

type SharedHardware = Arc<Mutex<Hardware>>;

// ─── Peripherals ────────────────────────────────────────────────────

/// Simulated analog monitors.
pub struct SimSensor {
    hw: SharedHardware,
}

impl Peripheral for SimSensor {
    fn name(&self) -> &'static str {
        "sensor"
    }
}

impl SensorDriver for SimSensor {
    fn read(&self, timeout: Duration) -> Result<SensorReadings, HalError> {
        let mut hw = self.hw.lock();
        hw.sensor_reads += 1;
        if hw.failing_sensor_reads > 0 {
            hw.failing_sensor_reads -= 1;
            return Err(HalError::Timeout(format!(
                "sensor conversion exceeded {timeout:?}"
            )));
        }
        Ok(hw.sample())
    }
}

/// Simulated synthesizer with a delayed lock indicator.
pub struct SimSynthesizer {
    hw: SharedHardware,
}

impl Peripheral for SimSynthesizer {
    fn name(&self) -> &'static str {
        "synthesizer"
    }
}

impl Synthesizer for SimSynthesizer {
    fn set_divider(&self, divider: u32) -> Result<(), HalError> {
        let mut hw = self.hw.lock();
        hw.divider = Some(divider);
        hw.divider_written_at = Some(Instant::now());
        hw.divider_writes += 1;
        debug!(divider, "Synthesizer divider written");
        Ok(())
    }

    fn is_locked(&self) -> Result<bool, HalError> {
        Ok(self.hw.lock().is_locked())
    }
}

/// Simulated RF output switch.
pub struct SimRfSwitch {
    hw: SharedHardware,
}

impl Peripheral for SimRfSwitch {
    fn name(&self) -> &'static str {
        "rf"
    }

    fn init(&self) -> Result<(), HalError> {
        self.hw.lock().rf_enabled = false;
        Ok(())
    }

    fn shutdown(&self) -> Result<(), HalError> {
        self.hw.lock().rf_enabled = false;
        Ok(())
    }
}

impl RfOutput for SimRfSwitch {
    fn set_enabled(&self, enabled: bool) -> Result<(), HalError> {
        self.hw.lock().rf_enabled = enabled;
        debug!(enabled, "RF switch set");
        Ok(())
    }
}

/// Simulated step attenuator latch.
pub struct SimAttenuator {
    hw: SharedHardware,
}

impl Peripheral for SimAttenuator {
    fn name(&self) -> &'static str {
        "attenuator"
    }
}

impl Attenuator for SimAttenuator {
    fn write_code(&self, code: u8) -> Result<(), HalError> {
        self.hw.lock().attenuator_code = Some(code);
        debug!(code, "Attenuator code latched");
        Ok(())
    }
}

/// Simulated front panel LEDs.
pub struct SimIndicator {
    hw: SharedHardware,
}

impl Peripheral for SimIndicator {
    fn name(&self) -> &'static str {
        "indicator"
    }

    fn init(&self) -> Result<(), HalError> {
        let mut hw = self.hw.lock();
        hw.status_led = false;
        hw.error_led = false;
        Ok(())
    }
}

impl StatusIndicator for SimIndicator {
    fn set_status(&self, on: bool) -> Result<(), HalError> {
        self.hw.lock().status_led = on;
        Ok(())
    }

    fn set_error(&self, on: bool) -> Result<(), HalError> {
        self.hw.lock().error_led = on;
        if on {
            warn!("Error LED on");
        }
        Ok(())
    }
}

/// Simulated reset line. Counts requests; the host process performs the reboot.
pub struct SimReset {
    hw: SharedHardware,
}

impl Peripheral for SimReset {
    fn name(&self) -> &'static str {
        "reset"
    }
}

impl SystemReset for SimReset {
    fn reset(&self) -> Result<(), HalError> {
        self.hw.lock().reset_count += 1;
        info!("System reset requested");
        Ok(())
    }
}

// ─── Inspection & fault injection ───────────────────────────────────

/// Test and diagnostics access to the simulated hardware.
#[derive(Clone)]
pub struct SimHandle {
    hw: SharedHardware,
}

impl SimHandle {
    /// Pin the temperature sensor to `temperature_c`, or release it with `None`.
    pub fn force_temperature(&self, temperature_c: Option<f64>) {
        self.hw.lock().forced_temperature = temperature_c;
    }

    /// Make the next `count` sensor reads time out.
    pub fn fail_sensor_reads(&self, count: u32) {
        self.hw.lock().failing_sensor_reads = count;
    }

    /// Hold the lock indicator low regardless of the divider.
    pub fn set_pll_fault(&self, fault: bool) {
        self.hw.lock().pll_fault = fault;
    }

    /// State of the RF switch.
    pub fn rf_enabled(&self) -> bool {
        self.hw.lock().rf_enabled
    }

    /// Last divider written to the synthesizer.
    pub fn divider(&self) -> Option<u32> {
        self.hw.lock().divider
    }

    /// Number of divider writes since power-up.
    pub fn divider_writes(&self) -> u32 {
        self.hw.lock().divider_writes
    }

    /// Last code latched into the attenuator.
    pub fn attenuator_code(&self) -> Option<u8> {
        self.hw.lock().attenuator_code
    }

    /// Status LED.
    pub fn status_led(&self) -> bool {
        self.hw.lock().status_led
    }

    /// Error LED.
    pub fn error_led(&self) -> bool {
        self.hw.lock().error_led
    }

    /// Number of reset requests.
    pub fn reset_count(&self) -> u32 {
        self.hw.lock().reset_count
    }

    /// Number of sensor acquisitions attempted.
    pub fn sensor_reads(&self) -> u32 {
        self.hw.lock().sensor_reads
    }
}

// ─── Board ──────────────────────────────────────────────────────────

/// The simulated board before a serial transport is attached.
pub struct SimulationBoard {
    hw: SharedHardware,
    calibration: Arc<dyn CalibrationStore>,
}

impl SimulationBoard {
    /// Build the board from configuration.
    ///
    /// Calibration goes to `board.calibration_path` when set, otherwise to memory.
    pub fn new(config: &GeneratorConfig) -> Self {
        let calibration: Arc<dyn CalibrationStore> = match &config.board.calibration_path {
            Some(path) => Arc::new(FileCalibrationStore::new(path)),
            None => Arc::new(MemoryCalibrationStore::default()),
        };
        info!(
            "Simulation board: ambient {:.1}°C, heating {:.1}°C, tau {:.1}s, lock delay {}ms",
            config.simulation.ambient_c,
            config.simulation.rf_heating_c,
            config.simulation.thermal_time_constant_s,
            config.simulation.lock_delay_ms
        );
        Self {
            hw: Arc::new(Mutex::new(Hardware::new(&config.simulation))),
            calibration,
        }
    }

    /// Replace the calibration store.
    pub fn with_calibration_store(mut self, store: Arc<dyn CalibrationStore>) -> Self {
        self.calibration = store;
        self
    }

    /// Inspection handle sharing this board's hardware.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            hw: Arc::clone(&self.hw),
        }
    }

    /// Attach a serial transport and produce the driver set.
    pub fn into_driver_set(self, rx: Arc<dyn SerialRx>, tx: Arc<dyn SerialTx>) -> DriverSet {
        let hw = self.hw;
        DriverSet {
            serial_rx: rx,
            serial_tx: tx,
            sensor: Arc::new(SimSensor { hw: Arc::clone(&hw) }),
            synthesizer: Arc::new(SimSynthesizer { hw: Arc::clone(&hw) }),
            rf: Arc::new(SimRfSwitch { hw: Arc::clone(&hw) }),
            attenuator: Arc::new(SimAttenuator { hw: Arc::clone(&hw) }),
            indicator: Arc::new(SimIndicator { hw: Arc::clone(&hw) }),
            calibration: self.calibration,
            reset: Arc::new(SimReset { hw }),
        }
    }

    /// Attach the process console.
    pub fn with_stdio(self) -> DriverSet {
        self.into_driver_set(Arc::new(StdinRx::new()), Arc::new(StdoutTx::new()))
    }

    /// Attach an in-process loopback link and return its host side.
    pub fn with_loopback(self) -> (DriverSet, LoopbackHost) {
        let (port, host) = loopback();
        let port = Arc::new(port);
        let rx: Arc<dyn SerialRx> = port.clone();
        (self.into_driver_set(rx, port), host)
    }
}
