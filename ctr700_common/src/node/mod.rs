//! Channel pipeline value logic.
//!
//! Everything here is pure: no driver access, no timers. The stateful
//! nodes in `ctr700_hal` compose these pieces.

pub mod analog;
pub mod config;
pub mod identity;
pub mod payload;
pub mod topic;

use thiserror::Error;

use crate::hal::error::DriverError;

/// Channel-level failure.
///
/// The first two variants are raised while a node opens and leave it
/// non-functional; `DriverCallFailed` wraps a native status code together
/// with the operation that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    /// Non-numeric or out-of-range user configuration.
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// Unparseable channel name or wrong prefix.
    #[error("Channel identity invalid: {0}")]
    ChannelIdentityInvalid(String),

    /// Native call returned a non-zero status.
    #[error("Driver call {operation} failed: {source}")]
    DriverCallFailed {
        /// Driver operation name.
        operation: &'static str,
        /// Translated native status.
        #[source]
        source: DriverError,
    },
}

impl ChannelError {
    /// Wrap a driver error with the failing operation.
    pub fn driver(operation: &'static str, source: DriverError) -> Self {
        Self::DriverCallFailed { operation, source }
    }
}
