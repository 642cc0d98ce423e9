//! Simulation backend.
//!
//! An in-memory board for development and testing without hardware.

mod board;

pub use board::{SimulatedBoard, SIMULATED_VERSION};

use std::sync::Arc;

use ctr700_common::config::AppConfig;
use ctr700_common::hal::driver::NativeApi;

/// Factory registered as `"simulation"`; presets come from `[simulation]`.
pub fn create_backend(config: &AppConfig) -> Arc<dyn NativeApi> {
    Arc::new(SimulatedBoard::from_config(&config.simulation))
}
