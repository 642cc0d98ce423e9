//! Channel pipeline integration tests.
//!
//! Each test builds an `IoCore` over a simulated board from a TOML node
//! list, drives the board's physical side and checks what reaches the
//! host.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ctr700_common::config::AppConfig;
use ctr700_common::node::payload::Payload;
use ctr700_hal::drivers::simulation::SimulatedBoard;
use ctr700_hal::status::StatusFill;
use ctr700_hal::{DriverHandle, HostEvent, InboundMessage, IoCore};

const MS: Duration = Duration::from_millis(1);

struct Rig {
    board: Arc<SimulatedBoard>,
    core: IoCore<Vec<HostEvent>>,
}

fn rig(body: &str) -> Rig {
    let toml = format!("[shared]\nservice_name = \"pipeline-test\"\n{body}");
    let config = AppConfig::from_toml(&toml).expect("valid config");
    config.validate().expect("config validates");
    let board = Arc::new(SimulatedBoard::from_config(&config.simulation));
    let driver = Arc::new(DriverHandle::new(board.clone()));
    let core = IoCore::from_config(driver, &config, Vec::new());
    Rig { board, core }
}

impl Rig {
    fn messages(&self) -> Vec<(String, Payload)> {
        self.core
            .sink()
            .iter()
            .filter_map(HostEvent::as_message)
            .map(|m| (m.topic.clone(), m.payload.clone()))
            .collect()
    }

    fn payloads(&self) -> Vec<Payload> {
        self.messages().into_iter().map(|(_, p)| p).collect()
    }

    fn status_texts(&self, node: &str) -> Vec<Option<String>> {
        self.core
            .sink()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Status { node: n, status } if n == node => {
                    Some(status.as_ref().map(|s| s.text.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn pump(&mut self) {
        self.core.process_pending(Instant::now());
    }
}

// ─── Digital inputs ─────────────────────────────────────────────────

#[test]
fn di_rising_edge_forwards_true_only() {
    let mut rig = rig(r#"
[[node]]
kind = "di"
name = "door"
channel = "IN_DI3"
edge = "EDGE_RISING"
"#);
    rig.core.start().unwrap();
    // Initial level low: shown, but filtered.
    assert!(rig.messages().is_empty());
    assert_eq!(rig.status_texts("door"), vec![Some("0".to_string())]);

    rig.board.set_digital_input(3, true);
    rig.board.set_digital_input(3, false);
    rig.pump();

    assert_eq!(rig.messages(), vec![("/di/3".to_string(), Payload::Bool(true))]);
    assert_eq!(
        rig.status_texts("door"),
        vec![Some("0".into()), Some("1".into()), Some("0".into())]
    );
    assert_eq!(rig.core.stats().notifications_dispatched, 2);
}

#[test]
fn di_both_edges_with_text_literals() {
    let mut rig = rig(r#"
[simulation]
digital_inputs_high = [1]

[[node]]
kind = "di"
name = "valve"
channel = "in_di1"
active = { type = "str", data = "OPEN" }
inactive = { type = "str", data = "Closed" }
alt_topic_enabled = true
alt_topic = " Plant/Valve "
"#);
    rig.core.start().unwrap();
    rig.board.set_digital_input(1, false);
    rig.board.set_digital_input(1, true);
    rig.pump();

    assert_eq!(
        rig.messages(),
        vec![
            ("plant/valve".to_string(), Payload::Text("open".into())),
            ("plant/valve".to_string(), Payload::Text("closed".into())),
            ("plant/valve".to_string(), Payload::Text("open".into())),
        ]
    );
}

#[test]
fn interrupts_from_another_thread_arrive_in_order() {
    let mut rig = rig(r#"
[[node]]
kind = "di"
name = "counter"
channel = "IN_DI7"
"#);
    rig.core.start().unwrap();

    let board = Arc::clone(&rig.board);
    thread::spawn(move || {
        for i in 0..50 {
            board.set_digital_input(7, i % 2 == 0);
        }
    })
    .join()
    .unwrap();
    rig.pump();

    let payloads = rig.payloads();
    assert_eq!(payloads.len(), 51, "initial read plus 50 edges");
    assert_eq!(payloads[0], Payload::Bool(false));
    for (i, p) in payloads[1..].iter().enumerate() {
        assert_eq!(*p, Payload::Bool(i % 2 == 0));
    }
}

#[test]
fn run_switch_events() {
    let mut rig = rig(r#"
[[node]]
kind = "switch"
name = "mode"
edge = "EDGE_FALLING"
active = { type = "num", data = "1" }
inactive = { type = "num", data = "0" }
"#);
    rig.core.start().unwrap();
    rig.board.set_run_switch(true);
    rig.board.set_run_switch(false);
    rig.pump();

    assert_eq!(
        rig.messages(),
        vec![
            ("/switch".to_string(), Payload::Number(0.0)),
            ("/switch".to_string(), Payload::Number(0.0)),
        ]
    );
    assert_eq!(
        rig.status_texts("mode"),
        vec![Some("Stop".into()), Some("Run".into()), Some("Stop".into())]
    );
}

#[test]
fn invalid_nodes_are_disabled_but_others_run() {
    let mut rig = rig(r#"
[[node]]
kind = "di"
name = "broken"
channel = "IN_DI"

[[node]]
kind = "di"
name = "bad edge"
channel = "IN_DI2"
edge = "EDGE_SOMETIMES"

[[node]]
kind = "di"
name = "good"
channel = "IN_DI4"
"#);
    assert_eq!(rig.core.node_count(), 3);
    assert_eq!(rig.core.enabled_count(), 1);
    assert!(!rig.core.is_enabled("broken"));
    assert!(rig.core.is_enabled("good"));
    assert_eq!(rig.board.interrupt_trigger(2), None);

    rig.core.start().unwrap();
    rig.board.set_digital_input(4, true);
    rig.pump();
    assert_eq!(rig.messages().last().unwrap().0, "/di/4");
}

// ─── Analog inputs ──────────────────────────────────────────────────

const TANK: &str = r#"
[runtime]
status_period_ms = 500

[simulation]
analog_raw = [16384]

[[node]]
kind = "ai"
name = "tank"
channel = "IN_AI0"
mode = "MODE_CURRENT_USER"
sample_rate = "100"
delta = "10"
upper = { type = "str", data = "10" }
lower = { type = "num", data = "0" }
decimal_places = "DECPLCE_2"
"#;

#[test]
fn ai_publishes_scaled_value_and_suppresses_small_changes() {
    let t0 = Instant::now();
    let mut rig = rig(TANK);
    assert_eq!(rig.board.analog_mode(0), Some(1));

    rig.core.start().unwrap();
    assert_eq!(
        rig.messages(),
        vec![("/ai/0".to_string(), Payload::Text("5.00".into()))]
    );

    // Same value, then a change below 10 * 8 raw counts.
    rig.core.process_pending(t0 + 150 * MS);
    rig.board.set_analog_raw(0, 16384 + 79);
    rig.core.process_pending(t0 + 250 * MS);
    assert_eq!(rig.messages().len(), 1);

    rig.board.set_analog_raw(0, 20000);
    rig.core.process_pending(t0 + 350 * MS);
    assert_eq!(
        rig.payloads(),
        vec![Payload::Text("5.00".into()), Payload::Text("6.10".into())]
    );
}

#[test]
fn ai_status_settles_after_debounce() {
    let t0 = Instant::now();
    let mut rig = rig(TANK);
    rig.core.start().unwrap();
    assert_eq!(rig.status_texts("tank"), vec![Some("Altered".to_string())]);

    rig.core.process_pending(t0 + 700 * MS);
    assert_eq!(
        rig.status_texts("tank"),
        vec![Some("Altered".to_string()), Some("Settled".to_string())]
    );

    rig.core.shutdown().unwrap();
    assert_eq!(rig.status_texts("tank").last(), Some(&None));
    assert!(!rig.board.is_initialized());
}

#[test]
fn ai_read_failure_is_retried() {
    let t0 = Instant::now();
    let mut rig = rig(TANK);
    rig.board.inject_failure("adc_get_value", 0xF7);
    rig.core.start().unwrap();
    rig.core.process_pending(t0 + 150 * MS);
    assert!(rig.messages().is_empty());
    assert!(rig.core.is_enabled("tank"));

    rig.board.clear_failure("adc_get_value");
    rig.core.process_pending(t0 + 250 * MS);
    assert_eq!(rig.payloads(), vec![Payload::Text("5.00".into())]);
}

#[test]
fn ai_invalid_config_shows_sticky_error() {
    let t0 = Instant::now();
    let mut rig = rig(r#"
[[node]]
kind = "ai"
name = "probe"
channel = "IN_AI1"
mode = "MODE_RESISTANCE"
sample_rate = "100"
delta = "1"
upper = { type = "num", data = "10" }
lower = { type = "num", data = "0" }
"#);
    assert!(!rig.core.is_enabled("probe"));
    assert_eq!(rig.board.init_calls(), 0);

    rig.core.start().unwrap();
    rig.core.process_pending(t0 + 2000 * MS);
    assert!(rig.messages().is_empty());
    assert_eq!(rig.status_texts("probe"), vec![Some("Error".to_string())]);
}

// ─── Outputs ────────────────────────────────────────────────────────

#[test]
fn do_writes_only_matching_literals() {
    let mut rig = rig(r#"
[[node]]
kind = "do"
name = "pump"
channel = "OUT_DO5"
active = { type = "num", data = "1" }
inactive = { type = "num", data = "0" }
"#);
    assert_eq!(rig.board.digital_output_writes(), 1, "initial state");
    assert!(!rig.board.digital_output(5));

    rig.core.submit(InboundMessage::new("/do/5", Payload::Number(1.0)));
    rig.pump();
    assert!(rig.board.digital_output(5));
    assert_eq!(rig.board.digital_output_writes(), 2);

    rig.core.submit(InboundMessage::new("/do/5", Payload::Number(2.0)));
    rig.core.submit(InboundMessage::new("/do/6", Payload::Number(0.0)));
    rig.core.submit(InboundMessage::new("", Payload::Number(0.0)));
    rig.pump();
    assert_eq!(rig.board.digital_output_writes(), 2);
    assert!(rig.board.digital_output(5));

    rig.core.shutdown().unwrap();
    assert!(!rig.board.digital_output(5), "reset on close");
}

#[test]
fn do_initial_state_and_relay_routing() {
    let mut rig = rig(r#"
[[node]]
kind = "do"
name = "horn"
channel = "OUT_DO17"
init_state = "INIT_STATE_ACTIVE"
"#);
    assert!(rig.board.relay(1));
    assert_eq!(rig.board.digital_output_writes(), 0);

    rig.core.submit(InboundMessage::new("/do/17", Payload::Bool(false)));
    rig.pump();
    assert!(!rig.board.relay(1));
}

#[test]
fn do_out_of_range_is_disabled() {
    let rig = rig(r#"
[[node]]
kind = "do"
name = "ghost"
channel = "OUT_DO18"
"#);
    assert!(!rig.core.is_enabled("ghost"));
    assert_eq!(rig.board.init_calls(), 0);
}

#[test]
fn wildcard_topic_and_node_addressing() {
    let mut rig = rig(r##"
[[node]]
kind = "do"
name = "a"
channel = "OUT_DO0"
alt_topic_enabled = true
alt_topic = "#"

[[node]]
kind = "do"
name = "b"
channel = "OUT_DO1"
alt_topic_enabled = true
alt_topic = "#"
"##);
    rig.core.submit(InboundMessage::new("anything", Payload::Bool(true)));
    rig.pump();
    assert!(rig.board.digital_output(0) && rig.board.digital_output(1));

    rig.core
        .submit(InboundMessage::to_node("b", "anything", Payload::Bool(false)));
    rig.pump();
    assert!(rig.board.digital_output(0));
    assert!(!rig.board.digital_output(1));
}

#[test]
fn led_err_shows_red() {
    let mut rig = rig(r#"
[[node]]
kind = "led"
name = "alarm"
led = "LED_ERR"
active = { type = "str", data = "on" }
inactive = { type = "str", data = "off" }
"#);
    rig.core.submit(InboundMessage::new("/led_err", Payload::Text("ON".into())));
    rig.pump();
    assert!(rig.board.err_led());

    let last = rig
        .core
        .sink()
        .iter()
        .rev()
        .find_map(|e| match e {
            HostEvent::Status { status: Some(s), .. } => Some(s.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last.fill, StatusFill::Red);
    assert_eq!(last.text, "1");
}

// ─── Watchdog ───────────────────────────────────────────────────────

#[test]
fn watchdog_is_serviced_while_running() {
    let t0 = Instant::now();
    let mut rig = rig(r#"
[watchdog]
enabled = true
monitor_only = true
service_interval_ms = 100
"#);
    rig.core.start().unwrap();
    assert_eq!(rig.board.watchdog(), Some(true));

    rig.core.process_pending(t0 + 150 * MS);
    rig.core.process_pending(t0 + 250 * MS);
    assert_eq!(rig.board.watchdog_services(), 2);
    assert_eq!(rig.core.stats().watchdog_services, 2);

    rig.core.shutdown().unwrap();
    assert_eq!(rig.board.shutdown_calls(), 1);
}
