//! Native driver boundary.
//!
//! This module contains the typed surface of the vendor driver library:
//! the entry-point trait, the fixed-layout structs it fills and the
//! translation of its integer status codes.

pub mod consts;
pub mod driver;
pub mod error;
pub mod types;
