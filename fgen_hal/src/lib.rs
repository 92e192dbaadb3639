//! # Frequency Generator HAL Library
//!
//! Board registry and driver implementations for the frequency generator.
//!
//! Drivers implement the peripheral traits defined in
//! `fgen_common::hal::driver`; a board factory bundles them into a
//! `DriverSet` that the control unit owns for the lifetime of a run.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Board factory registration
//! - [`drivers`] - Board implementations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      fgen_hal                             │
//! │  ┌─────────────────┐        ┌──────────────────────────┐  │
//! │  │ DriverRegistry  │──────► │ BoardFactory(&config)    │  │
//! │  │ name → factory  │        │   → DriverSet            │  │
//! │  └─────────────────┘        └────────────┬─────────────┘  │
//! │                                          ▼                │
//! │          sensor · synthesizer · rf · attenuator           │
//! │          indicator · calibration · reset · serial         │
//! └───────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::{BoardFactory, DriverRegistry};
