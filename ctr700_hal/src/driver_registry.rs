//! Backend registry.
//!
//! Provides a `BackendRegistry` struct for registering and retrieving
//! backend factories by name. Constructed at startup and populated via
//! [`crate::drivers::register_all_backends`]; no global state.

use std::collections::HashMap;
use std::sync::Arc;

use ctr700_common::config::AppConfig;
use ctr700_common::hal::driver::{BackendFactory, NativeApi};

use crate::core::CoreError;

/// Registry of available backends.
pub struct BackendRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        if self.factories.contains_key(name) {
            panic!("Backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BackendFactory> {
        self.factories.get(name).copied()
    }

    /// Create a backend instance by name.
    ///
    /// # Errors
    /// Returns `CoreError::BackendNotFound` if no backend with the given name is registered.
    pub fn create_backend(
        &self,
        name: &str,
        config: &AppConfig,
    ) -> Result<Arc<dyn NativeApi>, CoreError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| CoreError::BackendNotFound(name.to_string()))?;
        Ok(factory(config))
    }

    /// List all registered backend names.
    pub fn list_backends(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::register_all_backends;
    use crate::drivers::simulation::create_backend;

    fn config() -> AppConfig {
        AppConfig::from_toml("[shared]\nservice_name = \"test\"\n").unwrap()
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = BackendRegistry::new();
        reg.register("sim", create_backend);

        let backend = reg.create_backend("sim", &config()).expect("should create");
        assert_eq!(backend.name(), "simulation");
    }

    #[test]
    fn registry_backend_not_found() {
        let reg = BackendRegistry::new();
        let result = reg.create_backend("nonexistent", &config());
        assert!(matches!(result, Err(CoreError::BackendNotFound(_))));
    }

    #[test]
    fn builtin_backends() {
        let mut reg = BackendRegistry::new();
        register_all_backends(&mut reg);
        assert!(reg.list_backends().contains(&"simulation"));
        #[cfg(feature = "hardware")]
        assert!(reg.list_backends().contains(&"native"));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = BackendRegistry::new();
        reg.register("dup", create_backend);
        reg.register("dup", create_backend);
    }
}
