//! Frequency Generator Common Library
//!
//! Shared constants, configuration loading and driver contracts used by
//! every crate of the frequency generator workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - RF ranges, thermal thresholds, task periods
//! - [`config`] - Configuration loading traits and the generator config tree
//! - [`hal`] - Driver traits, `DriverSet` and shared value types
//! - [`control`] - Control-level value types shared with the drivers
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use fgen_common::consts::{RF_FREQ_MAX_HZ, RF_FREQ_MIN_HZ};
//! use fgen_common::config::{ConfigLoader, GeneratorConfig};
//! ```

pub mod config;
pub mod consts;
pub mod control;
pub mod hal;
pub mod prelude;
