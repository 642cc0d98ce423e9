//! Channel nodes.
//!
//! A node binds one configured I/O point to the host: inputs emit
//! messages, outputs consume them. Every node holds one instance of the
//! shared [`DriverHandle`] while open.
//!
//! # Module Structure
//!
//! - [`input`] - event-driven boolean inputs (digital inputs, run switch)
//! - [`analog`] - polled analog inputs
//! - [`output`] - message-driven outputs (digital outputs, relays, LEDs)
//!
//! # Lifecycle
//!
//! ```text
//! open ──► start ──► { on_interrupt | on_timer | on_input }* ──► close
//! ```
//!
//! A node whose configuration is invalid, or whose open-time hardware
//! setup fails, stays in the node list but disabled: it never touches the
//! hardware again and ignores every later event.

pub mod analog;
pub mod input;
pub mod output;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use ctr700_common::config::RuntimeConfig;
use ctr700_common::hal::error::DriverError;
use ctr700_common::node::config::{EdgePolicy, NodeConfig};
use ctr700_common::node::payload::Message;
use ctr700_common::node::ChannelError;

use crate::bridge::InterruptBridge;
use crate::core::{RuntimeStats, TimerEvent};
use crate::handle::DriverHandle;
use crate::host::{HostEvent, HostSink, InboundMessage};
use crate::status::{NodeStatus, Transition};
use crate::timer::{TimerId, TimerQueue};

pub use analog::AnalogInput;
pub use input::{DigitalInput, EventInput, RunSwitch};
pub use output::{DigitalOutput, LedOutput, MessageOutput};

/// Index of a node in the core's node list.
pub type NodeId = usize;

/// Timer purposes of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTimer {
    /// Periodic sampling.
    Sample,
    /// Status debounce tagged with its display instance.
    StatusDebounce {
        /// Instance the display armed the timer with.
        instance: u64,
    },
}

/// Everything a node may touch while handling one event.
pub struct NodeContext<'a> {
    /// Own id.
    pub id: NodeId,
    /// Own display name.
    pub name: &'a str,
    /// Pipeline traces enabled.
    pub trace: bool,
    /// Shared driver.
    pub driver: &'a DriverHandle,
    /// Current loop time.
    pub now: Instant,
    /// How long an analog node shows "Altered".
    pub status_period: Duration,
    pub(crate) bridge: &'a InterruptBridge,
    pub(crate) routes: &'a mut HashMap<u8, NodeId>,
    pub(crate) timers: &'a mut TimerQueue<TimerEvent>,
    pub(crate) sink: &'a mut dyn HostSink,
    pub(crate) stats: &'a mut RuntimeStats,
}

impl NodeContext<'_> {
    /// Emit a message to the host.
    pub fn send(&mut self, message: Message) {
        self.stats.messages_emitted += 1;
        self.sink.emit(HostEvent::Message {
            node: self.name.to_string(),
            message,
        });
    }

    /// Replace the status display; `None` clears it.
    pub fn show(&mut self, status: Option<NodeStatus>) {
        self.sink.emit(HostEvent::Status {
            node: self.name.to_string(),
            status,
        });
    }

    /// Render the display part of a status transition.
    pub fn render(&mut self, transition: &Transition) {
        if let Some(status) = &transition.render {
            self.show(status.clone());
        }
    }

    /// Arm a one-shot timer for this node.
    pub fn schedule_once(&mut self, delay: Duration, tag: NodeTimer) -> TimerId {
        let event = TimerEvent::Node { node: self.id, tag };
        self.timers.schedule_once(self.now, delay, event)
    }

    /// Arm an interval timer for this node.
    pub fn schedule_interval(&mut self, period: Duration, tag: NodeTimer) -> TimerId {
        let event = TimerEvent::Node { node: self.id, tag };
        self.timers.schedule_interval(self.now, period, event)
    }

    /// Cancel a timer of this node.
    pub fn cancel_timer(&mut self, id: TimerId) {
        self.timers.cancel(id);
    }

    /// Subscribe this node to interrupts of `channel`.
    pub fn subscribe_interrupt(&mut self, channel: u8, edge: EdgePolicy) -> Result<(), DriverError> {
        let rising = edge != EdgePolicy::Falling;
        let falling = edge != EdgePolicy::Rising;
        self.driver
            .register_interrupt(channel, rising, falling, self.bridge.handler())?;
        if let Some(previous) = self.routes.insert(channel, self.id) {
            if previous != self.id {
                warn!(
                    channel,
                    node = self.name,
                    previous,
                    "Interrupt channel taken over from another node"
                );
            }
        }
        Ok(())
    }

    /// Drop this node's interrupt subscription.
    ///
    /// Routing stops first, so notifications still queued for `channel`
    /// are discarded by the loop. A channel taken over by another node
    /// stays armed for that node.
    pub fn unsubscribe_interrupt(&mut self, channel: u8) -> Result<(), DriverError> {
        if self.routes.get(&channel) != Some(&self.id) {
            debug!(channel, node = self.name, "Interrupt channel owned by another node");
            return Ok(());
        }
        self.routes.remove(&channel);
        self.driver.unregister_interrupt(channel)
    }

    /// Emit a pipeline trace if enabled for this node.
    pub fn trace(&self, what: &str) {
        if self.trace {
            debug!(node = self.name, "{}", what);
        }
    }
}

/// One channel node.
pub trait Node: Send {
    /// Node kind (`di`, `ai`, `switch`, `do`, `led`).
    fn kind(&self) -> &'static str;

    /// Validate configuration and acquire the hardware.
    ///
    /// On error the node is disabled and holds no driver instance.
    fn open(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ChannelError>;

    /// All nodes are open; publish initial state and arm timers.
    fn start(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// Interrupt notification for a channel this node subscribed to.
    fn on_interrupt(&mut self, _ctx: &mut NodeContext<'_>, _value: u8) {}

    /// One of this node's timers fired.
    fn on_timer(&mut self, _ctx: &mut NodeContext<'_>, _timer: NodeTimer) {}

    /// Inbound host message.
    fn on_input(&mut self, _ctx: &mut NodeContext<'_>, _message: &InboundMessage) {}

    /// `true` if the node consumes host messages.
    fn accepts_input(&self) -> bool {
        false
    }

    /// `false` once open failed.
    fn is_enabled(&self) -> bool;

    /// Release timers, subscriptions and the driver instance.
    fn close(&mut self, ctx: &mut NodeContext<'_>);
}

/// Build the node for one `[[node]]` table.
pub fn build_node(config: &NodeConfig) -> Box<dyn Node> {
    match config {
        NodeConfig::Di(c) => Box::new(EventInput::<DigitalInput>::new(c.into())),
        NodeConfig::Switch(c) => Box::new(EventInput::<RunSwitch>::new(c.into())),
        NodeConfig::Ai(c) => Box::new(AnalogInput::new(c.clone())),
        NodeConfig::Do(c) => Box::new(MessageOutput::<DigitalOutput>::new(c.into())),
        NodeConfig::Led(c) => Box::new(MessageOutput::<LedOutput>::new(c.into())),
    }
}

/// `true` if a node emits pipeline traces.
pub fn trace_enabled(config: &NodeConfig, runtime: &RuntimeConfig) -> bool {
    runtime.trace_all || config.debug_enabled()
}

/// Release the driver instance taken by a node whose setup failed.
pub(crate) fn release_driver(ctx: &NodeContext<'_>) {
    if let Err(e) = ctx.driver.close() {
        warn!(node = ctx.name, "Driver close failed: {}", e);
    }
}
