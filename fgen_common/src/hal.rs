//! Hardware abstraction contracts.
//!
//! - [`driver`] - Driver traits, [`driver::DriverSet`] and [`driver::HalError`]
//! - [`types`] - Sensor readings and the calibration table

pub mod driver;
pub mod types;
