//! Application config loading tests.
//!
//! Tests for `AppConfig::load_validated()`: full file round, node kinds in
//! file order, duplicate node names, missing sections and defaults.

use ctr700_common::config::{AppConfig, BackendKind, ConfigError, LogLevel};
use ctr700_common::node::config::NodeConfig;
use std::fs;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
[shared]
log_level = "debug"
service_name = "ctr700-test"

[runtime]
backend = "simulation"
status_period_ms = 500
trace_all = true

[watchdog]
enabled = true
monitor_only = false
service_interval_ms = 100

[simulation]
digital_inputs_high = [0, 3]
analog_raw = [16384, 0, 0, 32767]
run_switch = true

[[node]]
kind = "di"
name = "door"
channel = "IN_DI3"

[[node]]
kind = "ai"
name = "tank"
channel = "IN_AI0"
mode = "MODE_CURRENT"
sample_rate = "200"
delta = "2"
upper = { type = "str", data = "100" }
lower = { type = "num", data = "0" }

[[node]]
kind = "switch"
name = "run"

[[node]]
kind = "do"
name = "pump"
channel = "OUT_DO5"

[[node]]
kind = "led"
name = "fault"
led = "LED_ERR"
"#;

/// Test: a complete file loads and validates.
#[test]
fn load_full_config() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ctr700.toml");
    fs::write(&path, FULL_CONFIG).unwrap();

    let config = AppConfig::load_validated(&path).expect("should load");
    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.runtime.backend, BackendKind::Simulation);
    assert_eq!(config.runtime.status_period_ms, 500);
    assert!(config.runtime.trace_all);
    assert!(config.watchdog.enabled);
    assert!(!config.watchdog.monitor_only);
    assert_eq!(config.simulation.analog_raw[0], 16384);
    assert!(config.simulation.run_switch);

    let kinds: Vec<_> = config.nodes.iter().map(NodeConfig::kind).collect();
    assert_eq!(kinds, ["di", "ai", "switch", "do", "led"]);
}

/// Test: duplicate node names are rejected.
#[test]
fn duplicate_node_name() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ctr700.toml");
    fs::write(
        &path,
        r#"
[shared]
service_name = "dup"

[[node]]
kind = "di"
name = "door"
channel = "IN_DI1"

[[node]]
kind = "do"
name = "door"
channel = "OUT_DO1"
"#,
    )
    .unwrap();

    let result = AppConfig::load_validated(&path);
    assert!(
        matches!(result, Err(ConfigError::ValidationError(ref msg)) if msg.contains("door")),
        "expected ValidationError for duplicate name"
    );
}

/// Test: unnamed nodes never collide.
#[test]
fn unnamed_nodes_allowed() {
    let config = AppConfig::from_toml(
        r#"
[shared]
service_name = "anon"

[[node]]
kind = "di"
channel = "IN_DI1"

[[node]]
kind = "di"
channel = "IN_DI2"
"#,
    )
    .unwrap();
    assert!(config.validate().is_ok());
}

/// Test: missing [shared] section is a parse error.
#[test]
fn missing_shared_section() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ctr700.toml");
    fs::write(&path, "[runtime]\nidle_tick_ms = 10\n").unwrap();

    assert!(matches!(
        AppConfig::load_validated(&path),
        Err(ConfigError::ParseError(_))
    ));
}

/// Test: invalid node properties do not fail loading.
#[test]
fn invalid_node_properties_deferred_to_open() {
    let config = AppConfig::from_toml(
        r#"
[shared]
service_name = "lazy"

[[node]]
kind = "ai"
channel = "IN_AI9"
mode = "MODE_NONE"
sample_rate = "soon"
upper = { type = "num", data = "x" }
lower = { type = "num", data = "y" }
"#,
    )
    .unwrap();
    assert!(config.validate().is_ok());
}

/// Test: enabled watchdog needs a service interval.
#[test]
fn watchdog_interval_required() {
    let config = AppConfig::from_toml(
        r#"
[shared]
service_name = "wd"

[watchdog]
enabled = true
service_interval_ms = 0
"#,
    )
    .unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(_))
    ));
}

/// Test: the shipped sample configuration loads.
#[test]
fn sample_config_is_valid() {
    let config = AppConfig::from_toml(include_str!("../../config/ctr700.toml")).unwrap();
    config.validate().unwrap();
    assert_eq!(config.nodes.len(), 6);
    assert!(config.nodes.iter().any(NodeConfig::debug_enabled));
}
