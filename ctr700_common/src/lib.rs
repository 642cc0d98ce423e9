//! CTR-700 Common Library
//!
//! This crate provides the shared pieces of the CTR-700 I/O runtime:
//! configuration loading, board constants, the typed native-driver
//! boundary and the pure value logic of the channel pipeline.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Board layout and runtime defaults
//! - [`hal`] - Native driver boundary (trait, raw structs, error codes)
//! - [`node`] - Channel identity, topics, payloads and value mappings
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use ctr700_common::config::{ConfigLoader, SharedConfig};
//! use ctr700_common::hal::error::DriverError;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod consts;
pub mod hal;
pub mod node;
pub mod prelude;
