//! Board implementations.
//!
//! - [`simulation`] - Software board for development and testing
//!
//! # Adding New Boards
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the peripheral traits from `fgen_common::hal::driver`
//! 3. Expose a `create_board` factory and register it below

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in boards.
pub fn register_all_boards(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_board);
}
