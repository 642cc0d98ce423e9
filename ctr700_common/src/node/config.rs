//! Per-node configuration (`[[node]]` tables).
//!
//! Properties are kept as the user entered them; numeric strings are
//! validated when the node opens so that a broken node stays listed but
//! disabled instead of failing the whole file.
//!
//! ```toml
//! [[node]]
//! kind = "di"
//! name = "door contact"
//! channel = "IN_DI3"
//! edge = "EDGE_RISING"
//! active = { type = "str", data = "open" }
//! inactive = { type = "str", data = "closed" }
//! ```

use serde::{Deserialize, Serialize};

use crate::node::ChannelError;
use crate::node::payload::{ActiveInactiveMapping, TypedLiteral, ValueType};

/// Node name prefix enabling per-node pipeline traces.
pub const DEBUG_NAME_PREFIX: &str = "DBG_";

fn default_active() -> TypedLiteral {
    TypedLiteral::new(ValueType::Bool, "true")
}

fn default_inactive() -> TypedLiteral {
    TypedLiteral::new(ValueType::Bool, "false")
}

fn default_edge() -> String {
    "EDGE_BOTH".to_string()
}

fn default_sample_unit() -> String {
    "SAMPLE_UNIT_MS".to_string()
}

fn default_decimal_places() -> String {
    "DECPLCE_ALL".to_string()
}

fn default_init_state() -> String {
    "INIT_STATE_INACTIVE".to_string()
}

/// Alternate topic override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicOverride {
    /// Use `alt_topic` instead of the default topic.
    #[serde(default)]
    pub alt_topic_enabled: bool,
    /// Alternate topic.
    #[serde(default)]
    pub alt_topic: String,
}

impl TopicOverride {
    /// Alternate topic if enabled.
    pub fn alternate(&self) -> Option<&str> {
        self.alt_topic_enabled.then_some(self.alt_topic.as_str())
    }
}

/// Edge policy of an event-driven input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePolicy {
    /// Forward `true` only.
    Rising,
    /// Forward `false` only.
    Falling,
    /// Forward both.
    Both,
}

impl EdgePolicy {
    /// Parse `EDGE_RISING` / `EDGE_FALLING` / `EDGE_BOTH`.
    pub fn parse(edge: &str) -> Result<Self, ChannelError> {
        match edge {
            "EDGE_RISING" => Ok(Self::Rising),
            "EDGE_FALLING" => Ok(Self::Falling),
            "EDGE_BOTH" => Ok(Self::Both),
            other => Err(ChannelError::ConfigurationInvalid(format!(
                "unknown edge policy '{other}'"
            ))),
        }
    }

    /// `true` if a value observed on the channel is forwarded.
    pub fn matches(self, value: bool) -> bool {
        match self {
            Self::Rising => value,
            Self::Falling => !value,
            Self::Both => true,
        }
    }
}

/// `true` only for `INIT_STATE_ACTIVE`.
pub fn parse_init_state(init_state: &str) -> bool {
    init_state == "INIT_STATE_ACTIVE"
}

/// Digital input node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalInputConfig {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// `IN_DI<n>`
    pub channel: String,
    /// Edge policy name.
    #[serde(default = "default_edge")]
    pub edge: String,
    /// Literal for `true`.
    #[serde(default = "default_active")]
    pub active: TypedLiteral,
    /// Literal for `false`.
    #[serde(default = "default_inactive")]
    pub inactive: TypedLiteral,
    /// Topic override.
    #[serde(flatten)]
    pub topic: TopicOverride,
}

/// Analog input node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalogInputConfig {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// `IN_AI<n>`
    pub channel: String,
    /// `MODE_VOLTAGE[_USER]` / `MODE_CURRENT[_USER]`
    pub mode: String,
    /// Sample rate, in `sample_unit`.
    pub sample_rate: String,
    /// `SAMPLE_UNIT_S` or `SAMPLE_UNIT_MS`.
    #[serde(default = "default_sample_unit")]
    pub sample_unit: String,
    /// Delta threshold in 12-bit units.
    #[serde(default)]
    pub delta: String,
    /// Unit-scale flag of the editor; informational.
    #[serde(default)]
    pub unit_1000: bool,
    /// Engineering value at full scale; its type selects the encoding.
    pub upper: TypedLiteral,
    /// Engineering value at zero.
    pub lower: TypedLiteral,
    /// `DECPLCE_0..3` / `DECPLCE_ALL`
    #[serde(default = "default_decimal_places")]
    pub decimal_places: String,
    /// Topic override.
    #[serde(flatten)]
    pub topic: TopicOverride,
}

/// Run/stop switch node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Edge policy name.
    #[serde(default = "default_edge")]
    pub edge: String,
    /// Literal for "Run".
    #[serde(default = "default_active")]
    pub active: TypedLiteral,
    /// Literal for "Stop".
    #[serde(default = "default_inactive")]
    pub inactive: TypedLiteral,
    /// Topic override.
    #[serde(flatten)]
    pub topic: TopicOverride,
}

/// Digital output node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalOutputConfig {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// `OUT_DO<n>`, 16 and 17 address the relays.
    pub channel: String,
    /// `INIT_STATE_ACTIVE` / `INIT_STATE_INACTIVE`
    #[serde(default = "default_init_state")]
    pub init_state: String,
    /// Literal for `true`.
    #[serde(default = "default_active")]
    pub active: TypedLiteral,
    /// Literal for `false`.
    #[serde(default = "default_inactive")]
    pub inactive: TypedLiteral,
    /// Topic override.
    #[serde(flatten)]
    pub topic: TopicOverride,
}

/// LED node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedConfig {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// `LED_RUN` / `LED_ERR`
    pub led: String,
    /// `INIT_STATE_ACTIVE` / `INIT_STATE_INACTIVE`
    #[serde(default = "default_init_state")]
    pub init_state: String,
    /// Literal for on.
    #[serde(default = "default_active")]
    pub active: TypedLiteral,
    /// Literal for off.
    #[serde(default = "default_inactive")]
    pub inactive: TypedLiteral,
    /// Topic override.
    #[serde(flatten)]
    pub topic: TopicOverride,
}

/// One `[[node]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeConfig {
    /// Digital input.
    Di(DigitalInputConfig),
    /// Analog input.
    Ai(AnalogInputConfig),
    /// Run/stop switch.
    Switch(SwitchConfig),
    /// Digital output.
    Do(DigitalOutputConfig),
    /// LED.
    Led(LedConfig),
}

impl NodeConfig {
    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Self::Di(c) => &c.name,
            Self::Ai(c) => &c.name,
            Self::Switch(c) => &c.name,
            Self::Do(c) => &c.name,
            Self::Led(c) => &c.name,
        }
    }

    /// Kind tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Di(_) => "di",
            Self::Ai(_) => "ai",
            Self::Switch(_) => "switch",
            Self::Do(_) => "do",
            Self::Led(_) => "led",
        }
    }

    /// `true` if the node emits pipeline traces.
    pub fn debug_enabled(&self) -> bool {
        self.name().starts_with(DEBUG_NAME_PREFIX)
    }
}

macro_rules! impl_mapping {
    ($($config:ty),+) => {
        $(
            impl $config {
                /// Active/Inactive value mapping.
                pub fn mapping(&self) -> ActiveInactiveMapping {
                    ActiveInactiveMapping::new(self.active.clone(), self.inactive.clone())
                }
            }
        )+
    };
}

impl_mapping!(DigitalInputConfig, SwitchConfig, DigitalOutputConfig, LedConfig);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Nodes {
        node: Vec<NodeConfig>,
    }

    #[test]
    fn parse_node_tables() {
        let nodes: Nodes = toml::from_str(
            r#"
[[node]]
kind = "di"
channel = "IN_DI3"
edge = "EDGE_RISING"

[[node]]
kind = "ai"
name = "DBG_tank"
channel = "IN_AI0"
mode = "MODE_VOLTAGE"
sample_rate = "1"
sample_unit = "SAMPLE_UNIT_S"
delta = "5"
upper = { type = "num", data = "10" }
lower = { type = "num", data = "0" }
decimal_places = "DECPLCE_2"
alt_topic_enabled = true
alt_topic = "/Tank/Level"

[[node]]
kind = "do"
channel = "OUT_DO16"
init_state = "INIT_STATE_ACTIVE"
active = { type = "num", data = "1" }
inactive = { type = "num", data = "0" }

[[node]]
kind = "switch"

[[node]]
kind = "led"
led = "LED_ERR"
"#,
        )
        .unwrap();

        assert_eq!(nodes.node.len(), 5);
        let NodeConfig::Di(di) = &nodes.node[0] else {
            panic!("expected di");
        };
        assert_eq!(di.edge, "EDGE_RISING");
        assert_eq!(di.mapping(), ActiveInactiveMapping::default());
        assert_eq!(di.topic.alternate(), None);

        let NodeConfig::Ai(ai) = &nodes.node[1] else {
            panic!("expected ai");
        };
        assert!(nodes.node[1].debug_enabled());
        assert_eq!(ai.upper.value_type, ValueType::Num);
        assert_eq!(ai.topic.alternate(), Some("/Tank/Level"));

        assert_eq!(nodes.node[2].kind(), "do");
        let NodeConfig::Switch(sw) = &nodes.node[3] else {
            panic!("expected switch");
        };
        assert_eq!(sw.edge, "EDGE_BOTH");
        assert_eq!(nodes.node[4].kind(), "led");
    }

    #[test]
    fn unknown_kind_rejected() {
        let result: Result<Nodes, _> = toml::from_str(
            r#"
[[node]]
kind = "pwm"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn edge_policy() {
        assert!(EdgePolicy::parse("EDGE_RISING").unwrap().matches(true));
        assert!(!EdgePolicy::parse("EDGE_RISING").unwrap().matches(false));
        assert!(EdgePolicy::parse("EDGE_FALLING").unwrap().matches(false));
        assert!(!EdgePolicy::parse("EDGE_FALLING").unwrap().matches(true));
        assert!(EdgePolicy::Both.matches(true) && EdgePolicy::Both.matches(false));
        assert!(EdgePolicy::parse("EDGE_ANY").is_err());
    }

    #[test]
    fn init_state() {
        assert!(parse_init_state("INIT_STATE_ACTIVE"));
        assert!(!parse_init_state("INIT_STATE_INACTIVE"));
        assert!(!parse_init_state(""));
    }
}
