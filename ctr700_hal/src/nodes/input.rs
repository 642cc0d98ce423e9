//! Event-driven boolean inputs.
//!
//! Digital inputs and the run/stop switch share one pipeline:
//!
//! ```text
//! interrupt ─► status ─► edge filter ─► Active/Inactive mapping ─► message
//! ```
//!
//! The status display always follows the observed level; only the message
//! is subject to the edge policy. On start the current level is read once
//! and published through the same pipeline.

use std::marker::PhantomData;

use tracing::{info, warn};

use ctr700_common::hal::error::DriverError;
use ctr700_common::node::config::{DigitalInputConfig, EdgePolicy, SwitchConfig, TopicOverride};
use ctr700_common::node::identity::ChannelIdentity;
use ctr700_common::node::payload::{ActiveInactiveMapping, Message};
use ctr700_common::node::topic::{build_topic, Direction};
use ctr700_common::node::ChannelError;

use crate::handle::DriverHandle;
use crate::nodes::{release_driver, Node, NodeContext};
use crate::status::{NodeStatus, StatusFill, StatusShape};

/// Hardware side of an event-driven input kind.
pub trait EventSource: Send + 'static {
    /// Node kind tag.
    const KIND: &'static str;

    /// Identity from the configured channel name.
    fn identity(channel: &str) -> Result<ChannelIdentity, ChannelError>;

    /// Current level.
    fn read(driver: &DriverHandle, identity: ChannelIdentity) -> Result<bool, DriverError>;

    /// Display of a level.
    fn status(level: bool) -> NodeStatus;
}

/// Physical digital input `IN_DI<n>`.
pub struct DigitalInput;

impl EventSource for DigitalInput {
    const KIND: &'static str = "di";

    fn identity(channel: &str) -> Result<ChannelIdentity, ChannelError> {
        ChannelIdentity::digital_input(channel)
    }

    fn read(driver: &DriverHandle, identity: ChannelIdentity) -> Result<bool, DriverError> {
        match identity {
            ChannelIdentity::DigitalInput(channel) => driver.get_digital_input(channel),
            _ => Err(DriverError::InvalidChannel),
        }
    }

    fn status(level: bool) -> NodeStatus {
        NodeStatus::binary(level, StatusFill::Green)
    }
}

/// Run/stop switch.
pub struct RunSwitch;

impl EventSource for RunSwitch {
    const KIND: &'static str = "switch";

    fn identity(_channel: &str) -> Result<ChannelIdentity, ChannelError> {
        Ok(ChannelIdentity::RunSwitch)
    }

    fn read(driver: &DriverHandle, _identity: ChannelIdentity) -> Result<bool, DriverError> {
        driver.get_run_switch()
    }

    fn status(level: bool) -> NodeStatus {
        if level {
            NodeStatus::new(StatusFill::Green, StatusShape::Dot, "Run")
        } else {
            NodeStatus::new(StatusFill::Grey, StatusShape::Ring, "Stop")
        }
    }
}

/// Configuration of an event-driven input, as entered.
#[derive(Debug, Clone)]
pub struct EventInputConfig {
    /// Channel name; ignored by the run switch.
    pub channel: String,
    /// Edge policy name.
    pub edge: String,
    /// Value mapping.
    pub mapping: ActiveInactiveMapping,
    /// Topic override.
    pub topic: TopicOverride,
}

impl From<&DigitalInputConfig> for EventInputConfig {
    fn from(c: &DigitalInputConfig) -> Self {
        Self {
            channel: c.channel.clone(),
            edge: c.edge.clone(),
            mapping: c.mapping(),
            topic: c.topic.clone(),
        }
    }
}

impl From<&SwitchConfig> for EventInputConfig {
    fn from(c: &SwitchConfig) -> Self {
        Self {
            channel: String::new(),
            edge: c.edge.clone(),
            mapping: c.mapping(),
            topic: c.topic.clone(),
        }
    }
}

struct Active {
    identity: ChannelIdentity,
    interrupt: u8,
    edge: EdgePolicy,
    topic: String,
}

/// Event-driven input node.
pub struct EventInput<S: EventSource> {
    config: EventInputConfig,
    active: Option<Active>,
    _source: PhantomData<S>,
}

impl<S: EventSource> EventInput<S> {
    /// Unopened node.
    pub fn new(config: EventInputConfig) -> Self {
        Self {
            config,
            active: None,
            _source: PhantomData,
        }
    }

    /// Topic of an open node.
    pub fn topic(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.topic.as_str())
    }

    fn publish(&self, ctx: &mut NodeContext<'_>, level: bool) {
        let Some(active) = &self.active else {
            return;
        };
        ctx.show(Some(S::status(level)));
        if !active.edge.matches(level) {
            ctx.trace(&format!("{} = {level} filtered by edge policy", active.identity));
            return;
        }
        let payload = self.config.mapping.encode(level);
        ctx.trace(&format!("{} = {level} -> {payload}", active.identity));
        ctx.send(Message::new(active.topic.clone(), payload));
    }
}

impl<S: EventSource> Node for EventInput<S> {
    fn kind(&self) -> &'static str {
        S::KIND
    }

    fn open(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ChannelError> {
        let identity = S::identity(&self.config.channel)?;
        let edge = EdgePolicy::parse(&self.config.edge)?;
        let interrupt = identity.interrupt_channel().ok_or_else(|| {
            ChannelError::ChannelIdentityInvalid(format!("{identity} has no interrupt"))
        })?;
        let topic = build_topic(
            &identity.default_topic(),
            self.config.topic.alternate(),
            Direction::Input,
        );

        ctx.driver
            .open()
            .map_err(|e| ChannelError::driver("initialize", e))?;
        if let Err(e) = ctx.subscribe_interrupt(interrupt, edge) {
            release_driver(ctx);
            return Err(ChannelError::driver("register_interrupt", e));
        }

        info!(node = ctx.name, %identity, topic = %topic, "Input opened");
        self.active = Some(Active {
            identity,
            interrupt,
            edge,
            topic,
        });
        Ok(())
    }

    fn start(&mut self, ctx: &mut NodeContext<'_>) {
        let Some(identity) = self.active.as_ref().map(|a| a.identity) else {
            return;
        };
        match S::read(ctx.driver, identity) {
            Ok(level) => self.publish(ctx, level),
            Err(e) => warn!(node = ctx.name, %identity, "Initial read failed: {}", e),
        }
    }

    fn on_interrupt(&mut self, ctx: &mut NodeContext<'_>, value: u8) {
        self.publish(ctx, value != 0);
    }

    fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    fn close(&mut self, ctx: &mut NodeContext<'_>) {
        let Some(active) = self.active.take() else {
            return;
        };
        if let Err(e) = ctx.unsubscribe_interrupt(active.interrupt) {
            warn!(node = ctx.name, channel = active.interrupt, "Unregister failed: {}", e);
        }
        release_driver(ctx);
    }
}
