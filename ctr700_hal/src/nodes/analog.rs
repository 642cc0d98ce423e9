//! Polled analog inputs.
//!
//! Each node samples its ADC channel once at start and then on a fixed
//! period. A sample passes only if it moved by at least the delta
//! threshold since the last published one; passing samples are scaled,
//! encoded and published, and flash the status display to "Altered".
//!
//! Invalid configuration or a failing mode setup shows a sticky "Error"
//! and the node never samples. A failing read in steady state is logged
//! and retried on the next period.

use std::time::Duration;

use tracing::{error, info, warn};

use ctr700_common::node::analog::{AnalogSettings, DeltaFilter};
use ctr700_common::node::config::AnalogInputConfig;
use ctr700_common::node::identity::ChannelIdentity;
use ctr700_common::node::payload::Message;
use ctr700_common::node::topic::{build_topic, Direction};
use ctr700_common::node::ChannelError;

use crate::nodes::{release_driver, Node, NodeContext, NodeTimer};
use crate::status::{Debounce, StatusDisplay, StatusState, Transition};
use crate::timer::TimerId;

struct Sampling {
    channel: u8,
    settings: AnalogSettings,
    topic: String,
    filter: DeltaFilter,
    sample_timer: Option<TimerId>,
}

/// Analog input node.
pub struct AnalogInput {
    config: AnalogInputConfig,
    sampling: Option<Sampling>,
    display: StatusDisplay,
    debounce_timer: Option<TimerId>,
}

impl AnalogInput {
    /// Unopened node.
    pub fn new(config: AnalogInputConfig) -> Self {
        Self {
            config,
            sampling: None,
            display: StatusDisplay::new(),
            debounce_timer: None,
        }
    }

    /// Current display state.
    pub fn status_state(&self) -> StatusState {
        self.display.state()
    }

    fn apply(&mut self, ctx: &mut NodeContext<'_>, transition: Transition) {
        ctx.render(&transition);
        match transition.debounce {
            Debounce::Keep => {}
            Debounce::Cancel => {
                if let Some(id) = self.debounce_timer.take() {
                    ctx.cancel_timer(id);
                }
            }
            Debounce::Restart { instance } => {
                if let Some(id) = self.debounce_timer.take() {
                    ctx.cancel_timer(id);
                }
                let id = ctx.schedule_once(
                    ctx.status_period,
                    NodeTimer::StatusDebounce { instance },
                );
                self.debounce_timer = Some(id);
            }
        }
    }

    fn sample(&mut self, ctx: &mut NodeContext<'_>) {
        let Some(sampling) = self.sampling.as_mut() else {
            return;
        };
        let raw = match ctx.driver.get_analog_input(sampling.channel) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(node = ctx.name, channel = sampling.channel, "ADC read failed: {}", e);
                return;
            }
        };
        if !sampling.filter.accept(raw) {
            ctx.trace(&format!(
                "raw {raw} within delta of {}",
                sampling.filter.last_published()
            ));
            return;
        }
        let payload = sampling.settings.mapping.encode(raw);
        ctx.trace(&format!("raw {raw} -> {payload}"));
        ctx.send(Message::new(sampling.topic.clone(), payload));

        let transition = self.display.enter(StatusState::Active);
        self.apply(ctx, transition);
    }

    fn fail(&mut self, ctx: &mut NodeContext<'_>, err: ChannelError) -> ChannelError {
        error!(node = ctx.name, "Analog input disabled: {}", err);
        let transition = self.display.enter(StatusState::Error);
        self.apply(ctx, transition);
        err
    }

    fn validate(&self) -> Result<(u8, AnalogSettings), ChannelError> {
        let channel = match ChannelIdentity::analog_input(&self.config.channel)? {
            ChannelIdentity::AnalogInput(channel) => channel,
            other => {
                return Err(ChannelError::ChannelIdentityInvalid(format!(
                    "{other} is not an analog input"
                )));
            }
        };
        let settings = AnalogSettings::from_config(&self.config)?;
        Ok((channel, settings))
    }
}

impl Node for AnalogInput {
    fn kind(&self) -> &'static str {
        "ai"
    }

    fn open(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), ChannelError> {
        let (channel, settings) = match self.validate() {
            Ok(valid) => valid,
            Err(e) => return Err(self.fail(ctx, e)),
        };
        if let Err(e) = ctx.driver.open() {
            return Err(self.fail(ctx, ChannelError::driver("initialize", e)));
        }
        if let Err(e) = ctx.driver.set_analog_mode(channel, settings.mode) {
            release_driver(ctx);
            return Err(self.fail(ctx, ChannelError::driver("set_analog_mode", e)));
        }

        let identity = ChannelIdentity::AnalogInput(channel);
        let topic = build_topic(
            &identity.default_topic(),
            self.config.topic.alternate(),
            Direction::Input,
        );
        info!(
            node = ctx.name,
            %identity,
            topic = %topic,
            period_ms = settings.period_ms,
            "Analog input opened"
        );
        self.sampling = Some(Sampling {
            channel,
            filter: DeltaFilter::new(settings.mapping.delta_threshold),
            settings,
            topic,
            sample_timer: None,
        });
        Ok(())
    }

    fn start(&mut self, ctx: &mut NodeContext<'_>) {
        let Some(period) = self.sampling.as_ref().map(|s| s.settings.period_ms) else {
            return;
        };
        self.sample(ctx);
        let id = ctx.schedule_interval(Duration::from_millis(period), NodeTimer::Sample);
        if let Some(sampling) = self.sampling.as_mut() {
            sampling.sample_timer = Some(id);
        }
    }

    fn on_timer(&mut self, ctx: &mut NodeContext<'_>, timer: NodeTimer) {
        match timer {
            NodeTimer::Sample => self.sample(ctx),
            NodeTimer::StatusDebounce { instance } => {
                let transition = self.display.debounce_elapsed(instance);
                if transition.render.is_some() {
                    self.debounce_timer = None;
                }
                self.apply(ctx, transition);
            }
        }
    }

    fn is_enabled(&self) -> bool {
        self.sampling.is_some()
    }

    fn close(&mut self, ctx: &mut NodeContext<'_>) {
        let sampling = self.sampling.take();
        if let Some(id) = sampling.as_ref().and_then(|s| s.sample_timer) {
            ctx.cancel_timer(id);
        }
        let transition = self.display.enter(StatusState::Undefined);
        self.apply(ctx, transition);
        if sampling.is_some() {
            release_driver(ctx);
        }
    }
}
