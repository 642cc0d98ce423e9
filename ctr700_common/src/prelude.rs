//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use ctr700_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use ctr700_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{AppConfig, BackendKind, ConfigError, ConfigLoader, SharedConfig};
pub use crate::node::config::NodeConfig;

// ─── Native Boundary ────────────────────────────────────────────────
pub use crate::hal::driver::{InterruptHandler, NativeApi};
pub use crate::hal::error::{translate, DriverError};
pub use crate::hal::types::{AnalogMode, DiagnosticInfo, DriverVersion, HardwareInfo, TriggerMask};

// ─── Channel Pipeline ───────────────────────────────────────────────
pub use crate::node::identity::ChannelIdentity;
pub use crate::node::payload::{ActiveInactiveMapping, Message, Payload};
pub use crate::node::ChannelError;
