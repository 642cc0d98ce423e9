//! Message-driven outputs.
//!
//! Digital outputs, relays and LEDs decode inbound payloads through their
//! Active/Inactive mapping and write the result. Messages whose topic
//! does not match, or whose payload matches neither literal, are ignored
//! without touching the hardware.
//!
//! The configured initial state is written on open; closing writes the
//! inactive state before the driver instance is released.

use std::marker::PhantomData;

use tracing::{info, warn};

use ctr700_common::hal::error::DriverError;
use ctr700_common::node::config::{parse_init_state, DigitalOutputConfig, LedConfig, TopicOverride};
use ctr700_common::node::identity::{ChannelIdentity, Led, OutputChannel};
use ctr700_common::node::payload::ActiveInactiveMapping;
use ctr700_common::node::topic::{build_topic, topic_matches, Direction};
use ctr700_common::node::ChannelError;

use crate::handle::DriverHandle;
use crate::host::InboundMessage;
use crate::nodes::{release_driver, Node, NodeContext};
use crate::status::{NodeStatus, StatusFill};

/// Hardware side of an output kind.
pub trait OutputTarget: Send + 'static {
    /// Node kind tag.
    const KIND: &'static str;

    /// Identity from the configured channel name.
    fn identity(channel: &str) -> Result<ChannelIdentity, ChannelError>;

    /// Write a state.
    fn write(driver: &DriverHandle, identity: ChannelIdentity, state: bool) -> Result<(), DriverError>;

    /// Display of a state.
    fn status(identity: ChannelIdentity, state: bool) -> NodeStatus;
}

/// Transistor output or relay `OUT_DO<n>`.
pub struct DigitalOutput;

impl OutputTarget for DigitalOutput {
    const KIND: &'static str = "do";

    fn identity(channel: &str) -> Result<ChannelIdentity, ChannelError> {
        ChannelIdentity::digital_output(channel)
    }

    fn write(driver: &DriverHandle, identity: ChannelIdentity, state: bool) -> Result<(), DriverError> {
        match identity {
            ChannelIdentity::DigitalOutput(OutputChannel::Transistor(c)) => {
                driver.set_digital_output(c, state)
            }
            ChannelIdentity::DigitalOutput(OutputChannel::Relay(r)) => driver.set_relay(r, state),
            _ => Err(DriverError::InvalidChannel),
        }
    }

    fn status(_identity: ChannelIdentity, state: bool) -> NodeStatus {
        NodeStatus::binary(state, StatusFill::Green)
    }
}

/// Front-panel LED.
pub struct LedOutput;

impl OutputTarget for LedOutput {
    const KIND: &'static str = "led";

    fn identity(channel: &str) -> Result<ChannelIdentity, ChannelError> {
        ChannelIdentity::led(channel)
    }

    fn write(driver: &DriverHandle, identity: ChannelIdentity, state: bool) -> Result<(), DriverError> {
        match identity {
            ChannelIdentity::Led(Led::Run) => driver.set_run_led(state),
            ChannelIdentity::Led(Led::Err) => driver.set_error_led(state),
            _ => Err(DriverError::InvalidChannel),
        }
    }

    fn status(identity: ChannelIdentity, state: bool) -> NodeStatus {
        let on_fill = match identity {
            ChannelIdentity::Led(Led::Err) => StatusFill::Red,
            _ => StatusFill::Green,
        };
        NodeStatus::binary(state, on_fill)
    }
}

/// Configuration of an output, as entered.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Channel or LED name.
    pub channel: String,
    /// Initial state selector.
    pub init_state: String,
    /// Value mapping.
    pub mapping: ActiveInactiveMapping,
    /// Topic override.
    pub topic: TopicOverride,
}

impl From<&DigitalOutputConfig> for OutputConfig {
    fn from(c: &DigitalOutputConfig) -> Self {
        Self {
            channel: c.channel.clone(),
            init_state: c.init_state.clone(),
            mapping: c.mapping(),
            topic: c.topic.clone(),
        }
    }
}

impl From<&LedConfig> for OutputConfig {
    fn from(c: &LedConfig) -> Self {
        Self {
            channel: c.led.clone(),
            init_state: c.init_state.clone(),
            mapping: c.mapping(),
            topic: c.topic.clone(),
        }
    }
}

struct Bound {
    identity: ChannelIdentity,
    topic: String,
}

/// Message-driven output node.
pub struct MessageOutput<T: OutputTarget> {
    config: OutputConfig,
    bound: Option<Bound>,
    _target: PhantomData<T>,
}

impl<T: OutputTarget> MessageOutput<T> {
    /// Unopened node.
    pub fn new(config: OutputConfig) -> Self {
        Self {
            config,
            bound: None,
            _target: PhantomData,
        }
    }

    /// Topic of an open node.
    pub fn topic(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.topic.as_str())
    }

    fn write(
        ctx: &mut NodeContext<'_>,
        identity: ChannelIdentity,
        state: bool,
    ) -> Result<(), DriverError> {
        T::write(ctx.driver, identity, state)?;
        ctx.show(Some(T::status(identity, state)));
        Ok(())
    }
}

impl<T: OutputTarget> Node for MessageOutput<T> {
    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn open(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ChannelError> {
        let identity = T::identity(&self.config.channel)?;
        let topic = build_topic(
            &identity.default_topic(),
            self.config.topic.alternate(),
            Direction::Output,
        );
        let init = parse_init_state(&self.config.init_state);

        ctx.driver
            .open()
            .map_err(|e| ChannelError::driver("initialize", e))?;
        if let Err(e) = Self::write(ctx, identity, init) {
            release_driver(ctx);
            return Err(ChannelError::driver("write_initial_state", e));
        }

        info!(node = ctx.name, %identity, topic = %topic, init, "Output opened");
        self.bound = Some(Bound { identity, topic });
        Ok(())
    }

    fn on_input(&mut self, ctx: &mut NodeContext<'_>, message: &InboundMessage) {
        let Some(bound) = &self.bound else {
            return;
        };
        if !topic_matches(&bound.topic, &message.topic) {
            ctx.trace(&format!("topic '{}' ignored", message.topic));
            return;
        }
        let Some(state) = self.config.mapping.decode(&message.payload) else {
            ctx.trace(&format!("payload '{}' matches no literal", message.payload));
            return;
        };
        ctx.trace(&format!("{} <- {state}", bound.identity));
        if let Err(e) = Self::write(ctx, bound.identity, state) {
            warn!(node = ctx.name, identity = %bound.identity, "Write failed: {}", e);
        }
    }

    fn accepts_input(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        self.bound.is_some()
    }

    fn close(&mut self, ctx: &mut NodeContext<'_>) {
        let Some(bound) = self.bound.take() else {
            return;
        };
        if let Err(e) = Self::write(ctx, bound.identity, false) {
            warn!(node = ctx.name, identity = %bound.identity, "Reset on close failed: {}", e);
        }
        release_driver(ctx);
    }
}
