//! # CTR-700 I/O Runtime Binary
//!
//! Opens the configured channel nodes on the board and bridges them to the
//! host as JSON lines: outbound messages and status changes on stdout,
//! inbound messages on stdin.
//!
//! # Usage
//!
//! ```bash
//! # Run with the simulation backend
//! ctr700_hal --config config/ctr700.toml --simulate
//!
//! # Run on the board (build with --features hardware)
//! ctr700_hal --config /etc/ctr700/ctr700.toml --backend native
//!
//! # Print board information and exit
//! ctr700_hal --config config/ctr700.toml --info
//! ```
//!
//! Inbound line format: `{"topic": "/do/3", "payload": 1}`, optionally with
//! `"node": "<name>"` to address one node.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use ctr700_common::config::{AppConfig, LogLevel};
use ctr700_common::consts::DEFAULT_CONFIG_PATH;
use ctr700_common::hal::types::{DiagnosticInfo, DriverVersion, HardwareInfo};
use ctr700_hal::drivers::register_all_backends;
use ctr700_hal::{BackendRegistry, DriverHandle, InboundMessage, IoCore, JsonLinesSink};

/// CTR-700 I/O runtime - channel nodes over the board driver
#[derive(Parser, Debug)]
#[command(name = "ctr700_hal")]
#[command(version)]
#[command(about = "CTR-700 board I/O runtime with pluggable driver backends")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force the simulation backend
    #[arg(short = 's', long)]
    simulate: bool,

    /// Backend name (overrides runtime.backend)
    #[arg(short, long)]
    backend: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Print board information as JSON and exit
    #[arg(long)]
    info: bool,
}

#[derive(Serialize)]
struct BoardInfo {
    backend: &'static str,
    version: DriverVersion,
    tick_count: u32,
    hardware: HardwareInfo,
    diagnostics: DiagnosticInfo,
    run_switch: bool,
    config_mode: bool,
    power_fail: bool,
    temperature: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("CTR-700 runtime failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Log level comes from the file; tracing must exist to report a bad file.
    let config = AppConfig::load_validated(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);
    let config = config.map_err(|e| format!("{}: {}", args.config.display(), e))?;

    info!(
        "CTR-700 runtime v{} starting ({})...",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let backend_name = if args.simulate {
        info!("Simulation mode enabled");
        "simulation".to_string()
    } else {
        args.backend
            .clone()
            .unwrap_or_else(|| config.runtime.backend.name().to_string())
    };

    let mut registry = BackendRegistry::new();
    register_all_backends(&mut registry);
    let backend = registry.create_backend(&backend_name, &config)?;
    let driver = Arc::new(DriverHandle::new(backend));

    if args.info {
        return print_board_info(&driver);
    }

    let sink = JsonLinesSink::new(io::stdout());
    let mut core = IoCore::from_config(Arc::clone(&driver), &config, sink);

    let running = core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    spawn_stdin_reader(core.inbound_sender());

    if let Err(e) = core.run() {
        error!("Event loop error: {}", e);
    }
    core.shutdown()?;

    info!("CTR-700 runtime shutdown complete");
    Ok(())
}

/// Forward stdin JSON lines to the event loop until EOF.
fn spawn_stdin_reader(tx: crossbeam_channel::Sender<InboundMessage>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<InboundMessage>(&line) {
                Ok(message) => {
                    if tx.send(message).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Ignoring inbound line: {}", e),
            }
        }
        info!("stdin closed; inbound messages disabled");
    });
}

fn print_board_info(driver: &DriverHandle) -> Result<(), Box<dyn std::error::Error>> {
    driver.open()?;
    let info = collect_board_info(driver);
    driver.close()?;

    println!("{}", serde_json::to_string_pretty(&info?)?);
    Ok(())
}

fn collect_board_info(driver: &DriverHandle) -> Result<BoardInfo, Box<dyn std::error::Error>> {
    Ok(BoardInfo {
        backend: driver.backend_name(),
        version: driver.get_version()?,
        tick_count: driver.get_tick_count()?,
        hardware: driver.get_hardware_info()?,
        diagnostics: driver.get_diagnostic_info()?,
        run_switch: driver.get_run_switch()?,
        config_mode: driver.get_config_mode()?,
        power_fail: driver.get_power_fail()?,
        temperature: driver.get_temperature(0)?,
    })
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()))
    };

    // stdout carries host events; logs go to stderr.
    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}
