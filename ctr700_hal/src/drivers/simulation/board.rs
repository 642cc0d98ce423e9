//! In-memory CTR-700 board.
//!
//! Behaves like `libctr700drv` at the ABI level: status codes, channel
//! range checks and "not initialized" failures. Test and demo code drives
//! the physical side (`set_digital_input`, `set_analog_raw`, ...) from any
//! thread; registered interrupt handlers fire on the calling thread, the
//! way the vendor library fires them on its own.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use ctr700_common::config::SimulationConfig;
use ctr700_common::consts::{AI_CHANNELS, DI_CHANNELS, DO_CHANNELS, RELAY_CHANNELS, RUN_SWITCH_CHANNEL};
use ctr700_common::hal::consts::STATUS_OK;
use ctr700_common::hal::driver::{InterruptHandler, NativeApi};
use ctr700_common::hal::error::DriverError;
use ctr700_common::hal::types::{RawDiagnosticInfo, RawHardwareInfo, TriggerMask};

const PWM_CHANNELS: usize = 2;
const TMP_CHANNELS: usize = 1;

/// Version reported by the simulated library.
pub const SIMULATED_VERSION: (u8, u8) = (1, 0);

/// Room temperature in the sensor's raw unit (1/100 degC).
const DEFAULT_TEMPERATURE: u32 = 2500;

fn code(err: DriverError) -> i32 {
    err.code()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PwmState {
    time_base: u8,
    period: u32,
    duty: u32,
    enabled: bool,
}

struct Subscription {
    handler: InterruptHandler,
    trigger: u32,
}

struct BoardState {
    initialized: bool,
    init_calls: u32,
    shutdown_calls: u32,
    started: Instant,

    digital_inputs: [bool; DI_CHANNELS],
    digital_outputs: [bool; DO_CHANNELS],
    digital_output_writes: u64,
    relays: [bool; RELAY_CHANNELS],
    analog: [u16; AI_CHANNELS],
    analog_modes: [Option<u8>; AI_CHANNELS],
    temperatures: [u32; TMP_CHANNELS],
    pwm: [Option<PwmState>; PWM_CHANNELS],

    run_led: bool,
    err_led: bool,
    run_switch: bool,
    config_enabled: u8,
    power_fail: u8,
    ext_fail: u8,
    ext_reset: bool,
    diagnostics: RawDiagnosticInfo,

    watchdog: Option<bool>,
    watchdog_services: u64,

    interrupts: HashMap<u8, Subscription>,
    failures: HashMap<&'static str, i32>,
}

impl BoardState {
    fn new() -> Self {
        Self {
            initialized: false,
            init_calls: 0,
            shutdown_calls: 0,
            started: Instant::now(),
            digital_inputs: [false; DI_CHANNELS],
            digital_outputs: [false; DO_CHANNELS],
            digital_output_writes: 0,
            relays: [false; RELAY_CHANNELS],
            analog: [0; AI_CHANNELS],
            analog_modes: [None; AI_CHANNELS],
            temperatures: [DEFAULT_TEMPERATURE; TMP_CHANNELS],
            pwm: [None; PWM_CHANNELS],
            run_led: false,
            err_led: false,
            run_switch: false,
            config_enabled: 0,
            power_fail: 0,
            ext_fail: 0,
            ext_reset: false,
            diagnostics: RawDiagnosticInfo::default(),
            watchdog: None,
            watchdog_services: 0,
            interrupts: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    /// Common prologue: injected failure first, then the init check.
    fn check(&self, op: &'static str) -> Result<(), i32> {
        if let Some(&status) = self.failures.get(op) {
            return Err(status);
        }
        if !self.initialized {
            return Err(code(DriverError::DeviceAccessFailed));
        }
        Ok(())
    }
}

fn index(channel: u8, len: usize) -> Result<usize, i32> {
    let idx = usize::from(channel);
    if idx < len {
        Ok(idx)
    } else {
        Err(code(DriverError::InvalidChannel))
    }
}

fn status(result: Result<(), i32>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(status) => status,
    }
}

/// Simulated board implementing the native driver surface.
pub struct SimulatedBoard {
    state: Mutex<BoardState>,
}

impl SimulatedBoard {
    /// Board with every input low.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BoardState::new()),
        }
    }

    /// Board preset from the `[simulation]` section.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let board = Self::new();
        {
            let mut state = board.state.lock();
            for &ch in &config.digital_inputs_high {
                if let Some(slot) = state.digital_inputs.get_mut(usize::from(ch)) {
                    *slot = true;
                }
            }
            for (slot, &raw) in state.analog.iter_mut().zip(&config.analog_raw) {
                *slot = raw;
            }
            state.run_switch = config.run_switch;
        }
        board
    }

    fn op(&self, op: &'static str, f: impl FnOnce(&mut BoardState) -> Result<(), i32>) -> i32 {
        let mut state = self.state.lock();
        status(state.check(op).and_then(|()| f(&mut state)))
    }

    // ─── Failure injection ──────────────────────────────────────────

    /// Make every call of `op` return `status` until cleared.
    ///
    /// `op` is the [`NativeApi`] method name, e.g. `"adc_get_value"`.
    pub fn inject_failure(&self, op: &'static str, status: i32) {
        self.state.lock().failures.insert(op, status);
    }

    /// Remove an injected failure.
    pub fn clear_failure(&self, op: &'static str) {
        self.state.lock().failures.remove(op);
    }

    // ─── Physical side ──────────────────────────────────────────────

    /// Drive a digital input; fires the interrupt on a level change.
    pub fn set_digital_input(&self, channel: u8, high: bool) {
        let changed = {
            let mut state = self.state.lock();
            match state.digital_inputs.get_mut(usize::from(channel)) {
                Some(slot) if *slot != high => {
                    *slot = high;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.fire(channel, high);
        }
    }

    /// Move the run/stop switch; fires the interrupt on a change.
    pub fn set_run_switch(&self, run: bool) {
        let changed = {
            let mut state = self.state.lock();
            let changed = state.run_switch != run;
            state.run_switch = run;
            changed
        };
        if changed {
            self.fire(RUN_SWITCH_CHANNEL, run);
        }
    }

    /// Set the raw ADC value of an analog channel.
    pub fn set_analog_raw(&self, channel: u8, raw: u16) {
        if let Some(slot) = self.state.lock().analog.get_mut(usize::from(channel)) {
            *slot = raw;
        }
    }

    /// Set a raw temperature value.
    pub fn set_temperature(&self, channel: u8, raw: u32) {
        if let Some(slot) = self.state.lock().temperatures.get_mut(usize::from(channel)) {
            *slot = raw;
        }
    }

    /// Set the board power-fail flag.
    pub fn set_power_fail(&self, fail: bool) {
        self.state.lock().power_fail = u8::from(fail);
    }

    /// Set the raw bytes reported for config mode, power fail and ext fail.
    pub fn set_status_bytes(&self, config_enabled: u8, power_fail: u8, ext_fail: u8) {
        let mut state = self.state.lock();
        state.config_enabled = config_enabled;
        state.power_fail = power_fail;
        state.ext_fail = ext_fail;
    }

    /// Set the diagnostic flags.
    pub fn set_diagnostics(&self, diagnostics: RawDiagnosticInfo) {
        self.state.lock().diagnostics = diagnostics;
    }

    fn fire(&self, channel: u8, high: bool) {
        let handler = {
            let state = self.state.lock();
            state.interrupts.get(&channel).and_then(|sub| {
                let edge = if high {
                    TriggerMask::RISING
                } else {
                    TriggerMask::FALLING
                };
                TriggerMask::from_bits_truncate(sub.trigger)
                    .contains(edge)
                    .then(|| sub.handler.clone())
            })
        };
        // Called without the board lock, handlers may call back in.
        if let Some(handler) = handler {
            handler(channel, u8::from(high));
        }
    }

    // ─── Observation ────────────────────────────────────────────────

    /// `initialize` calls that succeeded.
    pub fn init_calls(&self) -> u32 {
        self.state.lock().init_calls
    }

    /// `shut_down` calls that succeeded.
    pub fn shutdown_calls(&self) -> u32 {
        self.state.lock().shutdown_calls
    }

    /// `true` between initialize and shutdown.
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Last written state of a transistor output.
    pub fn digital_output(&self, channel: u8) -> bool {
        let state = self.state.lock();
        state
            .digital_outputs
            .get(usize::from(channel))
            .copied()
            .unwrap_or(false)
    }

    /// Number of successful transistor-output writes.
    pub fn digital_output_writes(&self) -> u64 {
        self.state.lock().digital_output_writes
    }

    /// Last written state of a relay.
    pub fn relay(&self, channel: u8) -> bool {
        let state = self.state.lock();
        state
            .relays
            .get(usize::from(channel))
            .copied()
            .unwrap_or(false)
    }

    /// Run LED state.
    pub fn run_led(&self) -> bool {
        self.state.lock().run_led
    }

    /// Error LED state.
    pub fn err_led(&self) -> bool {
        self.state.lock().err_led
    }

    /// Mode code last written to an analog channel.
    pub fn analog_mode(&self, channel: u8) -> Option<u8> {
        let state = self.state.lock();
        state.analog_modes.get(usize::from(channel)).copied().flatten()
    }

    /// `(time_base, period, duty, enabled)` of a PWM channel.
    pub fn pwm(&self, channel: u8) -> Option<(u8, u32, u32, bool)> {
        let state = self.state.lock();
        state
            .pwm
            .get(usize::from(channel))
            .copied()
            .flatten()
            .map(|p| (p.time_base, p.period, p.duty, p.enabled))
    }

    /// Trigger mask of a registered interrupt.
    pub fn interrupt_trigger(&self, channel: u8) -> Option<u32> {
        self.state.lock().interrupts.get(&channel).map(|s| s.trigger)
    }

    /// `Some(monitor_only)` once the watchdog is enabled.
    pub fn watchdog(&self) -> Option<bool> {
        self.state.lock().watchdog
    }

    /// Number of watchdog services.
    pub fn watchdog_services(&self) -> u64 {
        self.state.lock().watchdog_services
    }

    /// External reset line.
    pub fn ext_reset(&self) -> bool {
        self.state.lock().ext_reset
    }
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeApi for SimulatedBoard {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn get_version(&self, major: &mut u8, minor: &mut u8) -> i32 {
        (*major, *minor) = SIMULATED_VERSION;
        STATUS_OK
    }

    fn initialize(&self) -> i32 {
        let mut state = self.state.lock();
        if let Some(&status) = state.failures.get("initialize") {
            return status;
        }
        state.initialized = true;
        state.init_calls += 1;
        debug!("Simulated board initialized");
        STATUS_OK
    }

    fn shut_down(&self) -> i32 {
        self.op("shut_down", |s| {
            s.initialized = false;
            s.shutdown_calls += 1;
            s.interrupts.clear();
            s.watchdog = None;
            debug!("Simulated board shut down");
            Ok(())
        })
    }

    fn get_tick_count(&self, ticks: &mut u32) -> i32 {
        self.op("get_tick_count", |s| {
            // Wraps like the hardware counter.
            *ticks = s.started.elapsed().as_millis() as u32;
            Ok(())
        })
    }

    fn enable_watchdog(&self, monitor_only: u8) -> i32 {
        self.op("enable_watchdog", |s| {
            s.watchdog = Some(monitor_only != 0);
            Ok(())
        })
    }

    fn service_watchdog(&self) -> i32 {
        self.op("service_watchdog", |s| {
            if s.watchdog.is_none() {
                return Err(code(DriverError::InvalidMode));
            }
            s.watchdog_services += 1;
            Ok(())
        })
    }

    fn get_hardware_info(&self, info: &mut RawHardwareInfo) -> i32 {
        self.op("get_hardware_info", |_| {
            *info = RawHardwareInfo {
                pcb_revision: 0,
                di_channels: DI_CHANNELS as u16,
                do_channels: DO_CHANNELS as u16,
                relay_channels: RELAY_CHANNELS as u16,
                ai_channels: AI_CHANNELS as u16,
                ao_channels: 0,
                cnt_channels: 0,
                enc_channels: 0,
                pwm_channels: PWM_CHANNELS as u16,
                tmp_channels: TMP_CHANNELS as u16,
            };
            Ok(())
        })
    }

    fn set_run_led(&self, state: u8) -> i32 {
        self.op("set_run_led", |s| {
            s.run_led = state != 0;
            Ok(())
        })
    }

    fn set_err_led(&self, state: u8) -> i32 {
        self.op("set_err_led", |s| {
            s.err_led = state != 0;
            Ok(())
        })
    }

    fn get_run_switch(&self, state: &mut u8) -> i32 {
        self.op("get_run_switch", |s| {
            *state = u8::from(s.run_switch);
            Ok(())
        })
    }

    fn get_config_enabled(&self, state: &mut u8) -> i32 {
        self.op("get_config_enabled", |s| {
            *state = s.config_enabled;
            Ok(())
        })
    }

    fn get_power_fail(&self, state: &mut u8) -> i32 {
        self.op("get_power_fail", |s| {
            *state = s.power_fail;
            Ok(())
        })
    }

    fn get_diag_info(&self, info: &mut RawDiagnosticInfo) -> i32 {
        self.op("get_diag_info", |s| {
            *info = s.diagnostics;
            Ok(())
        })
    }

    fn get_ext_fail(&self, state: &mut u8) -> i32 {
        self.op("get_ext_fail", |s| {
            *state = s.ext_fail;
            Ok(())
        })
    }

    fn set_ext_reset(&self, state: u8) -> i32 {
        self.op("set_ext_reset", |s| {
            s.ext_reset = state != 0;
            Ok(())
        })
    }

    fn get_digi_in(&self, channel: u8, state: &mut u8) -> i32 {
        self.op("get_digi_in", |s| {
            let idx = index(channel, DI_CHANNELS)?;
            *state = u8::from(s.digital_inputs[idx]);
            Ok(())
        })
    }

    fn set_digi_out(&self, channel: u8, state: u8) -> i32 {
        self.op("set_digi_out", |s| {
            let idx = index(channel, DO_CHANNELS)?;
            s.digital_outputs[idx] = state != 0;
            s.digital_output_writes += 1;
            Ok(())
        })
    }

    fn set_relay(&self, channel: u8, state: u8) -> i32 {
        self.op("set_relay", |s| {
            let idx = index(channel, RELAY_CHANNELS)?;
            s.relays[idx] = state != 0;
            Ok(())
        })
    }

    fn adc_get_value(&self, channel: u8, value: &mut u16) -> i32 {
        self.op("adc_get_value", |s| {
            let idx = index(channel, AI_CHANNELS)?;
            *value = s.analog[idx];
            Ok(())
        })
    }

    fn adc_set_mode(&self, channel: u8, mode: u8) -> i32 {
        self.op("adc_set_mode", |s| {
            let idx = index(channel, AI_CHANNELS)?;
            if mode > 1 {
                return Err(code(DriverError::InvalidMode));
            }
            s.analog_modes[idx] = Some(mode);
            Ok(())
        })
    }

    fn tmp_get_value(&self, channel: u8, value: &mut u32) -> i32 {
        self.op("tmp_get_value", |s| {
            let idx = index(channel, TMP_CHANNELS)?;
            *value = s.temperatures[idx];
            Ok(())
        })
    }

    fn pwm_set_time_base(&self, channel: u8, time_base: u8) -> i32 {
        self.op("pwm_set_time_base", |s| {
            let idx = index(channel, PWM_CHANNELS)?;
            s.pwm[idx].get_or_insert_with(PwmState::default).time_base = time_base;
            Ok(())
        })
    }

    fn pwm_set_param(&self, channel: u8, period: u32, duty: u32) -> i32 {
        self.op("pwm_set_param", |s| {
            let idx = index(channel, PWM_CHANNELS)?;
            if duty > period {
                return Err(code(DriverError::InvalidParameter));
            }
            let pwm = s.pwm[idx].get_or_insert_with(PwmState::default);
            pwm.period = period;
            pwm.duty = duty;
            Ok(())
        })
    }

    fn pwm_enable(&self, channel: u8, enable: u8) -> i32 {
        self.op("pwm_enable", |s| {
            let idx = index(channel, PWM_CHANNELS)?;
            s.pwm[idx].get_or_insert_with(PwmState::default).enabled = enable != 0;
            Ok(())
        })
    }

    fn register_interrupt_callback(
        &self,
        channel: u8,
        handler: InterruptHandler,
        trigger: u32,
    ) -> i32 {
        self.op("register_interrupt_callback", |s| {
            if channel != RUN_SWITCH_CHANNEL {
                index(channel, DI_CHANNELS)?;
            }
            s.interrupts.insert(channel, Subscription { handler, trigger });
            Ok(())
        })
    }

    fn unregister_interrupt_callback(&self, channel: u8) -> i32 {
        self.op("unregister_interrupt_callback", |s| {
            s.interrupts.remove(&channel);
            Ok(())
        })
    }
}
