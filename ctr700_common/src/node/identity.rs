//! Channel identities and channel-name parsing.
//!
//! Physical channels are named with a kind prefix and a number
//! (`IN_DI3`, `IN_AI0`, `OUT_DO17`); LEDs use symbolic names.

use std::fmt;

use crate::consts::{AI_CHANNELS, DI_CHANNELS, DO_CHANNEL_MAX, RELAY_CHANNEL_BASE, RUN_SWITCH_CHANNEL};
use crate::node::ChannelError;
use crate::node::payload::parse_int_prefix;

/// Digital input name prefix.
pub const DI_PREFIX: &str = "IN_DI";
/// Analog input name prefix.
pub const AI_PREFIX: &str = "IN_AI";
/// Digital output name prefix.
pub const DO_PREFIX: &str = "OUT_DO";

/// Channel number from a prefixed channel name.
///
/// The name is trimmed and uppercased before the prefix check; the number
/// is the leading integer after the prefix.
pub fn parse_channel_number(name: &str, prefix: &str) -> Result<u8, ChannelError> {
    let normalized = name.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(ChannelError::ChannelIdentityInvalid(
            "channel name is empty".to_string(),
        ));
    }
    let Some(number) = normalized.strip_prefix(prefix) else {
        return Err(ChannelError::ChannelIdentityInvalid(format!(
            "{name}: expected prefix {prefix}"
        )));
    };
    parse_int_prefix(number)
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| {
            ChannelError::ChannelIdentityInvalid(format!("{name}: invalid channel number"))
        })
}

/// Reject a channel number at or above `count`.
fn check_range(channel: u8, count: usize, kind: &str) -> Result<u8, ChannelError> {
    if usize::from(channel) < count {
        Ok(channel)
    } else {
        Err(ChannelError::ChannelIdentityInvalid(format!(
            "{kind} {channel} out of range (0..{count})"
        )))
    }
}

/// Hardware target of a digital-output channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    /// Transistor output `DO0..DO15`.
    Transistor(u8),
    /// Relay `REL0..REL1`, addressed as `DO16..DO17`.
    Relay(u8),
}

impl OutputChannel {
    /// Route a digital-output channel number.
    pub fn from_number(channel: u8) -> Result<Self, ChannelError> {
        match channel {
            c if c < RELAY_CHANNEL_BASE => Ok(Self::Transistor(c)),
            c if c <= DO_CHANNEL_MAX => Ok(Self::Relay(c - RELAY_CHANNEL_BASE)),
            c => Err(ChannelError::ChannelIdentityInvalid(format!(
                "digital output {c} out of range (0..={DO_CHANNEL_MAX})"
            ))),
        }
    }

    /// Channel number as used in names and topics.
    pub fn number(self) -> u8 {
        match self {
            Self::Transistor(c) => c,
            Self::Relay(r) => r + RELAY_CHANNEL_BASE,
        }
    }
}

/// Front-panel LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Led {
    /// Green run LED.
    Run,
    /// Red error LED.
    Err,
}

impl Led {
    /// Parse `LED_RUN` / `LED_ERR`.
    pub fn parse(name: &str) -> Result<Self, ChannelError> {
        match name.trim().to_uppercase().as_str() {
            "LED_RUN" => Ok(Self::Run),
            "LED_ERR" => Ok(Self::Err),
            _ => Err(ChannelError::ChannelIdentityInvalid(format!(
                "{name}: unknown LED"
            ))),
        }
    }

    /// Symbolic name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Run => "LED_RUN",
            Self::Err => "LED_ERR",
        }
    }
}

/// Identity of one physical or virtual I/O point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelIdentity {
    /// Physical digital input.
    DigitalInput(u8),
    /// Physical analog input.
    AnalogInput(u8),
    /// Virtual run/stop switch input.
    RunSwitch,
    /// Digital output or relay.
    DigitalOutput(OutputChannel),
    /// Status LED.
    Led(Led),
}

impl ChannelIdentity {
    /// Parse an `IN_DI<n>` name.
    pub fn digital_input(name: &str) -> Result<Self, ChannelError> {
        let number = parse_channel_number(name, DI_PREFIX)?;
        check_range(number, DI_CHANNELS, "digital input").map(Self::DigitalInput)
    }

    /// Parse an `IN_AI<n>` name.
    pub fn analog_input(name: &str) -> Result<Self, ChannelError> {
        let number = parse_channel_number(name, AI_PREFIX)?;
        check_range(number, AI_CHANNELS, "analog input").map(Self::AnalogInput)
    }

    /// Parse an `OUT_DO<n>` name.
    pub fn digital_output(name: &str) -> Result<Self, ChannelError> {
        let number = parse_channel_number(name, DO_PREFIX)?;
        OutputChannel::from_number(number).map(Self::DigitalOutput)
    }

    /// Parse an LED name.
    pub fn led(name: &str) -> Result<Self, ChannelError> {
        Led::parse(name).map(Self::Led)
    }

    /// Interrupt channel for event-driven inputs.
    pub fn interrupt_channel(self) -> Option<u8> {
        match self {
            Self::DigitalInput(c) => Some(c),
            Self::RunSwitch => Some(RUN_SWITCH_CHANNEL),
            _ => None,
        }
    }

    /// Kind-specific default topic.
    pub fn default_topic(self) -> String {
        match self {
            Self::DigitalInput(c) => format!("/di/{c}"),
            Self::AnalogInput(c) => format!("/ai/{c}"),
            Self::RunSwitch => "/switch".to_string(),
            Self::DigitalOutput(out) => format!("/do/{}", out.number()),
            Self::Led(led) => format!("/{}", led.name().to_lowercase()),
        }
    }
}

impl fmt::Display for ChannelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DigitalInput(c) => write!(f, "{DI_PREFIX}{c}"),
            Self::AnalogInput(c) => write!(f, "{AI_PREFIX}{c}"),
            Self::RunSwitch => f.write_str("RUN_SWITCH"),
            Self::DigitalOutput(out) => write!(f, "{DO_PREFIX}{}", out.number()),
            Self::Led(led) => f.write_str(led.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!(
            ChannelIdentity::digital_input(" in_di3 ").unwrap(),
            ChannelIdentity::DigitalInput(3)
        );
        assert_eq!(
            ChannelIdentity::analog_input("IN_AI2").unwrap(),
            ChannelIdentity::AnalogInput(2)
        );
    }

    #[test]
    fn reject_wrong_prefix_and_missing_number() {
        assert!(matches!(
            ChannelIdentity::digital_input("IN_AI1"),
            Err(ChannelError::ChannelIdentityInvalid(_))
        ));
        assert!(matches!(
            ChannelIdentity::digital_input("IN_DI"),
            Err(ChannelError::ChannelIdentityInvalid(_))
        ));
        assert!(matches!(
            ChannelIdentity::digital_input(""),
            Err(ChannelError::ChannelIdentityInvalid(_))
        ));
    }

    #[test]
    fn reject_out_of_range_inputs() {
        assert_eq!(
            ChannelIdentity::digital_input("IN_DI15").unwrap(),
            ChannelIdentity::DigitalInput(15)
        );
        // 128 would alias the run switch interrupt.
        for name in ["IN_DI16", "IN_DI128"] {
            assert!(matches!(
                ChannelIdentity::digital_input(name),
                Err(ChannelError::ChannelIdentityInvalid(_))
            ));
        }
        assert_eq!(
            ChannelIdentity::analog_input("IN_AI3").unwrap(),
            ChannelIdentity::AnalogInput(3)
        );
        assert!(matches!(
            ChannelIdentity::analog_input("IN_AI4"),
            Err(ChannelError::ChannelIdentityInvalid(_))
        ));
    }

    #[test]
    fn relay_routing() {
        assert_eq!(
            ChannelIdentity::digital_output("OUT_DO15").unwrap(),
            ChannelIdentity::DigitalOutput(OutputChannel::Transistor(15))
        );
        assert_eq!(
            ChannelIdentity::digital_output("OUT_DO16").unwrap(),
            ChannelIdentity::DigitalOutput(OutputChannel::Relay(0))
        );
        assert_eq!(OutputChannel::Relay(1).number(), 17);
        assert!(ChannelIdentity::digital_output("OUT_DO18").is_err());
    }

    #[test]
    fn default_topics() {
        assert_eq!(ChannelIdentity::DigitalInput(3).default_topic(), "/di/3");
        assert_eq!(ChannelIdentity::AnalogInput(2).default_topic(), "/ai/2");
        assert_eq!(
            ChannelIdentity::DigitalOutput(OutputChannel::Transistor(5)).default_topic(),
            "/do/5"
        );
        assert_eq!(ChannelIdentity::RunSwitch.default_topic(), "/switch");
        assert_eq!(ChannelIdentity::Led(Led::Err).default_topic(), "/led_err");
    }

    #[test]
    fn interrupt_channels() {
        assert_eq!(ChannelIdentity::DigitalInput(4).interrupt_channel(), Some(4));
        assert_eq!(ChannelIdentity::RunSwitch.interrupt_channel(), Some(0x80));
        assert_eq!(ChannelIdentity::Led(Led::Run).interrupt_channel(), None);
    }
}
