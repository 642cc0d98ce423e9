//! # CTR-700 HAL Library
//!
//! Driver binding and channel event runtime for the CTR-700 controller
//! board. The native driver library is reached through the `NativeApi`
//! trait defined in `ctr700_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`core`] - IoCore struct, event loop
//! - [`handle`] - reference-counted driver handle
//! - [`bridge`] - interrupt hand-off to the event loop
//! - [`driver_registry`] - backend factory registration
//! - [`drivers`] - backend implementations
//! - [`nodes`] - DI, AI, switch, DO and LED channel nodes
//! - [`status`] - node status display
//! - [`timer`] - timer queue
//! - [`host`] - outbound events and inbound messages
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                         ctr700_hal                                 │
//! │  ┌────────────┐   ┌──────────────────────┐   ┌──────────────────┐  │
//! │  │ HostSink / │◄─►│  IoCore (event loop) │◄──│ InterruptBridge  │  │
//! │  │ inbound rx │   │  nodes, timers       │   │ (any thread)     │  │
//! │  └────────────┘   └──────────┬───────────┘   └────────▲─────────┘  │
//! │                              ▼                        │            │
//! │                   ┌────────────────────┐              │            │
//! │                   │ Arc<DriverHandle>  │──────────────┘            │
//! │                   │ refcount, handlers │                           │
//! │                   └─────────┬──────────┘                           │
//! │                             ▼                                      │
//! │                   ┌────────────────────┐                           │
//! │                   │  NativeApi         │ simulation | libctr700drv │
//! │                   └────────────────────┘                           │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod handle;
pub mod host;
pub mod nodes;
pub mod status;
pub mod timer;

// Re-export key types for convenience
pub use crate::core::{CoreError, IoCore, RuntimeStats};
pub use crate::driver_registry::BackendRegistry;
pub use crate::handle::DriverHandle;
pub use crate::host::{HostEvent, HostSink, InboundMessage, JsonLinesSink};
