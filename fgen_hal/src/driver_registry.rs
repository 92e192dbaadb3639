//! Board registry.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving board
//! factories by name. This uses constructor-injection rather than global state.

use fgen_common::config::GeneratorConfig;
use fgen_common::hal::driver::{DriverSet, HalError};
use std::collections::HashMap;

/// Factory function type for creating a complete board.
pub type BoardFactory = fn(&GeneratorConfig) -> Result<DriverSet, HalError>;

/// Registry of available boards.
///
/// Constructed at startup, populated via `register()`, and consulted once
/// per run to build the `DriverSet`.
pub struct DriverRegistry {
    factories: HashMap<&'static str, BoardFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in board.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_boards(&mut registry);
        registry
    }

    /// Register a board factory.
    ///
    /// # Panics
    /// Panics if a board with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BoardFactory) {
        if self.factories.contains_key(name) {
            panic!("Board '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a board factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BoardFactory> {
        self.factories.get(name).copied()
    }

    /// Build the drivers of the named board.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no board with the given name is
    /// registered, or the factory's own error.
    pub fn create_board(
        &self,
        name: &str,
        config: &GeneratorConfig,
    ) -> Result<DriverSet, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// List all registered board names.
    pub fn list_boards(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_board(_config: &GeneratorConfig) -> Result<DriverSet, HalError> {
        Err(HalError::InitFailed("no hardware".to_string()))
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let result = reg.create_board("nonexistent", &GeneratorConfig::default());
        assert!(matches!(result, Err(HalError::DriverNotFound(_))));
    }

    #[test]
    fn registry_propagates_factory_error() {
        let mut reg = DriverRegistry::new();
        reg.register("broken", failing_board);
        let result = reg.create_board("broken", &GeneratorConfig::default());
        assert!(matches!(result, Err(HalError::InitFailed(_))));
    }

    #[test]
    fn registry_list_boards() {
        let mut reg = DriverRegistry::new();
        reg.register("alpha", failing_board);
        reg.register("beta", failing_board);

        let mut names = reg.list_boards();
        names.sort();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn builtin_registry_has_simulation() {
        let reg = DriverRegistry::with_builtin();
        assert!(reg.get_factory("simulation").is_some());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = DriverRegistry::new();
        reg.register("dup", failing_board);
        reg.register("dup", failing_board);
    }
}
