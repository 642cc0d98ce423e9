//! Driver backends.
//!
//! - [`simulation`] - in-memory board for development and testing
//! - `native` - `libctr700drv` bindings (feature `hardware`)
//!
//! # Adding New Backends
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `NativeApi` from `ctr700_common::hal::driver`
//! 3. Register its factory in [`register_all_backends`]

#[cfg(feature = "hardware")]
pub mod native;
pub mod simulation;

use crate::driver_registry::BackendRegistry;

/// Register all built-in backends.
pub fn register_all_backends(registry: &mut BackendRegistry) {
    registry.register("simulation", simulation::create_backend);

    #[cfg(feature = "hardware")]
    registry.register("native", native::create_backend);
}
