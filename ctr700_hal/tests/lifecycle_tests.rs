//! Driver lifecycle and event-loop integration tests.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ctr700_common::config::{AppConfig, ConfigError, ConfigLoader};
use ctr700_common::node::payload::Payload;
use ctr700_hal::drivers::register_all_backends;
use ctr700_hal::drivers::simulation::SimulatedBoard;
use ctr700_hal::{BackendRegistry, CoreError, DriverHandle, HostEvent, InboundMessage, IoCore};
use tempfile::TempDir;

const CONFIG: &str = r#"
[shared]
service_name = "lifecycle-test"

[runtime]
idle_tick_ms = 10

[[node]]
kind = "di"
name = "start button"
channel = "IN_DI0"
edge = "EDGE_RISING"

[[node]]
kind = "do"
name = "lamp"
channel = "OUT_DO0"
"#;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("ctr700.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn shared_handle_initializes_once_and_shuts_down_last() {
    let board = Arc::new(SimulatedBoard::new());
    let driver = Arc::new(DriverHandle::new(board.clone()));

    let a = Arc::clone(&driver);
    let b = Arc::clone(&driver);
    a.open().unwrap();
    b.open().unwrap();
    assert_eq!(board.init_calls(), 1);

    a.close().unwrap();
    assert!(board.is_initialized());
    b.close().unwrap();
    assert!(!board.is_initialized());
    assert_eq!(board.shutdown_calls(), 1);

    // Reopening after a full shutdown initializes again.
    driver.open().unwrap();
    assert_eq!(board.init_calls(), 2);
    driver.close().unwrap();
}

#[test]
fn nodes_share_one_initialization() {
    let dir = TempDir::new().unwrap();
    let config = AppConfig::load_validated(&write_config(&dir, CONFIG)).unwrap();
    let board = Arc::new(SimulatedBoard::new());
    let driver = Arc::new(DriverHandle::new(board.clone()));

    let mut core = IoCore::from_config(Arc::clone(&driver), &config, Vec::new());
    assert_eq!(driver.instance_count(), 2);
    assert_eq!(board.init_calls(), 1);
    assert!(driver.is_subscribed(0));

    core.shutdown().unwrap();
    assert_eq!(driver.instance_count(), 0);
    assert!(!driver.is_subscribed(0));
    assert_eq!(board.shutdown_calls(), 1);
}

#[test]
fn failed_initialize_disables_nodes_without_counting() {
    let config = AppConfig::from_toml(CONFIG).unwrap();
    let board = Arc::new(SimulatedBoard::new());
    board.inject_failure("initialize", 0xF7);
    let driver = Arc::new(DriverHandle::new(board.clone()));

    let mut core = IoCore::from_config(Arc::clone(&driver), &config, Vec::new());
    assert_eq!(core.enabled_count(), 0);
    assert_eq!(driver.instance_count(), 0);

    // Closing disabled nodes must not unbalance the handle.
    core.shutdown().unwrap();
    assert_eq!(board.shutdown_calls(), 0);
}

#[test]
fn event_loop_runs_until_flag_cleared() {
    let config = AppConfig::from_toml(CONFIG).unwrap();
    let board = Arc::new(SimulatedBoard::new());
    let driver = Arc::new(DriverHandle::new(board.clone()));
    let (tx, rx) = crossbeam_channel::unbounded::<HostEvent>();

    let mut core = IoCore::from_config(driver, &config, tx);
    let running = core.running_flag();
    let inbound = core.inbound_sender();

    let worker = thread::spawn(move || {
        core.run().unwrap();
        core.shutdown().unwrap();
        core.stats()
    });

    // Wait for the loop to come up.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !running.load(Ordering::SeqCst) {
        assert!(std::time::Instant::now() < deadline, "loop did not start");
        thread::sleep(Duration::from_millis(1));
    }

    board.set_digital_input(0, true);
    let message = loop {
        let event = rx.recv_timeout(Duration::from_secs(5)).expect("event");
        if let Some(m) = event.as_message() {
            break m.clone();
        }
    };
    assert_eq!(message.topic, "/di/0");
    assert_eq!(message.payload, Payload::Bool(true));

    inbound
        .send(InboundMessage::new("/do/0", Payload::Bool(true)))
        .unwrap();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !board.digital_output(0) {
        assert!(std::time::Instant::now() < deadline, "output not written");
        thread::sleep(Duration::from_millis(1));
    }

    running.store(false, Ordering::SeqCst);
    let stats = worker.join().unwrap();
    assert_eq!(stats.messages_received, 1);
    assert!(!board.is_initialized());
    assert!(!board.digital_output(0));
}

#[test]
fn backend_selection() {
    let config = AppConfig::from_toml(
        r#"
[shared]
service_name = "backend-test"

[simulation]
run_switch = true
"#,
    )
    .unwrap();
    let mut registry = BackendRegistry::new();
    register_all_backends(&mut registry);

    let backend = registry.create_backend("simulation", &config).unwrap();
    let driver = DriverHandle::new(backend);
    driver.open().unwrap();
    assert!(driver.get_run_switch().unwrap());
    assert_eq!(driver.backend_name(), "simulation");
    driver.close().unwrap();

    assert!(matches!(
        registry.create_backend("ethercat", &config),
        Err(CoreError::BackendNotFound(name)) if name == "ethercat"
    ));
}

#[test]
fn missing_config_file() {
    let result = AppConfig::load(Path::new("/nonexistent/ctr700.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}
