//! Process-wide driver handle.
//!
//! The native library must be initialized exactly once no matter how many
//! nodes use it, and shut down only after the last one is gone. The handle
//! counts open instances and owns every interrupt handler handed to the
//! native layer, so the handler stays alive for as long as the native side
//! may call it.
//!
//! One `Arc<DriverHandle>` is created at startup and cloned into every
//! consumer; there is no global instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use ctr700_common::hal::consts::PWM_TIME_BASE;
use ctr700_common::hal::driver::{InterruptHandler, NativeApi};
use ctr700_common::hal::error::{translate, DriverError};
use ctr700_common::hal::types::{
    AnalogMode, DiagnosticInfo, DriverVersion, HardwareInfo, RawDiagnosticInfo, RawHardwareInfo,
    TriggerMask,
};
use ctr700_common::consts::AI_CHANNELS;

#[derive(Default)]
struct HandleState {
    instances: usize,
    subscriptions: HashMap<u8, InterruptHandler>,
}

/// Reference-counted gateway to one native backend.
pub struct DriverHandle {
    api: Arc<dyn NativeApi>,
    state: Mutex<HandleState>,
}

impl DriverHandle {
    /// Wrap a backend. Nothing is initialized until the first [`open`](Self::open).
    pub fn new(api: Arc<dyn NativeApi>) -> Self {
        Self {
            api,
            state: Mutex::new(HandleState::default()),
        }
    }

    /// Name of the wrapped backend.
    pub fn backend_name(&self) -> &'static str {
        self.api.name()
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Acquire one instance; the first one initializes the library.
    ///
    /// A failed initialization leaves the count unchanged.
    pub fn open(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.instances == 0 {
            translate(self.api.initialize())?;
            info!(backend = self.api.name(), "Driver initialized");
        }
        state.instances += 1;
        debug!(instances = state.instances, "Driver instance opened");
        Ok(())
    }

    /// Release one instance; the last one shuts the library down.
    ///
    /// The count is decremented even if shutdown reports an error.
    ///
    /// # Panics
    /// Panics if called more often than [`open`](Self::open) succeeded.
    pub fn close(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if state.instances == 0 {
            panic!("Driver handle closed more often than opened");
        }
        state.instances -= 1;
        debug!(instances = state.instances, "Driver instance closed");
        if state.instances == 0 {
            if !state.subscriptions.is_empty() {
                debug!(
                    count = state.subscriptions.len(),
                    "Dropping interrupt subscriptions at shutdown"
                );
                state.subscriptions.clear();
            }
            info!(backend = self.api.name(), "Driver shut down");
            return translate(self.api.shut_down());
        }
        Ok(())
    }

    /// Currently open instances.
    pub fn instance_count(&self) -> usize {
        self.state.lock().instances
    }

    // ─── Board information ──────────────────────────────────────────

    /// Library version.
    pub fn get_version(&self) -> Result<DriverVersion, DriverError> {
        let (mut major, mut minor) = (0u8, 0u8);
        translate(self.api.get_version(&mut major, &mut minor))?;
        Ok(DriverVersion { major, minor })
    }

    /// Millisecond tick counter.
    pub fn get_tick_count(&self) -> Result<u32, DriverError> {
        let mut ticks = 0u32;
        translate(self.api.get_tick_count(&mut ticks))?;
        Ok(ticks)
    }

    /// Channel counts and PCB revision.
    pub fn get_hardware_info(&self) -> Result<HardwareInfo, DriverError> {
        let mut raw = RawHardwareInfo::default();
        translate(self.api.get_hardware_info(&mut raw))?;
        Ok(raw.into())
    }

    /// Diagnostic flags.
    pub fn get_diagnostic_info(&self) -> Result<DiagnosticInfo, DriverError> {
        let mut raw = RawDiagnosticInfo::default();
        translate(self.api.get_diag_info(&mut raw))?;
        Ok(raw.into())
    }

    // ─── Watchdog ───────────────────────────────────────────────────

    /// Arm the board watchdog.
    pub fn enable_watchdog(&self, monitor_only: bool) -> Result<(), DriverError> {
        translate(self.api.enable_watchdog(u8::from(monitor_only)))
    }

    /// Retrigger the board watchdog.
    pub fn service_watchdog(&self) -> Result<(), DriverError> {
        translate(self.api.service_watchdog())
    }

    // ─── Digital I/O ────────────────────────────────────────────────

    /// Read one digital input.
    pub fn get_digital_input(&self, channel: u8) -> Result<bool, DriverError> {
        let mut state = 0u8;
        translate(self.api.get_digi_in(channel, &mut state))?;
        Ok(state != 0)
    }

    /// Write one transistor output.
    pub fn set_digital_output(&self, channel: u8, state: bool) -> Result<(), DriverError> {
        translate(self.api.set_digi_out(channel, u8::from(state)))
    }

    /// Write one relay.
    pub fn set_relay(&self, channel: u8, state: bool) -> Result<(), DriverError> {
        translate(self.api.set_relay(channel, u8::from(state)))
    }

    // ─── Analog / temperature / PWM ─────────────────────────────────

    /// Raw ADC value of one channel.
    pub fn get_analog_input(&self, channel: u8) -> Result<u16, DriverError> {
        let mut value = 0u16;
        translate(self.api.adc_get_value(channel, &mut value))?;
        Ok(value)
    }

    /// Raw ADC values of all channels; fails on the first failing channel.
    pub fn get_analog_inputs(&self) -> Result<[u16; AI_CHANNELS], DriverError> {
        let mut values = [0u16; AI_CHANNELS];
        for (channel, value) in (0u8..).zip(values.iter_mut()) {
            *value = self.get_analog_input(channel)?;
        }
        Ok(values)
    }

    /// Select voltage or current measurement.
    pub fn set_analog_mode(&self, channel: u8, mode: AnalogMode) -> Result<(), DriverError> {
        translate(self.api.adc_set_mode(channel, mode.code()))
    }

    /// Raw temperature sensor value.
    pub fn get_temperature(&self, channel: u8) -> Result<u32, DriverError> {
        let mut value = 0u32;
        translate(self.api.tmp_get_value(channel, &mut value))?;
        Ok(value)
    }

    /// Configure and start a PWM output.
    pub fn enable_pwm(&self, channel: u8, period: u32, duty: u32) -> Result<(), DriverError> {
        translate(self.api.pwm_set_time_base(channel, PWM_TIME_BASE))?;
        translate(self.api.pwm_set_param(channel, period, duty))?;
        translate(self.api.pwm_enable(channel, 1))
    }

    /// Stop a PWM output.
    pub fn disable_pwm(&self, channel: u8) -> Result<(), DriverError> {
        translate(self.api.pwm_enable(channel, 0))
    }

    // ─── LEDs and board status ──────────────────────────────────────

    /// Switch the run LED.
    pub fn set_run_led(&self, state: bool) -> Result<(), DriverError> {
        translate(self.api.set_run_led(u8::from(state)))
    }

    /// Switch the error LED.
    pub fn set_error_led(&self, state: bool) -> Result<(), DriverError> {
        translate(self.api.set_err_led(u8::from(state)))
    }

    /// `true` if the run/stop switch is in "Run".
    pub fn get_run_switch(&self) -> Result<bool, DriverError> {
        let mut state = 0u8;
        translate(self.api.get_run_switch(&mut state))?;
        Ok(state == 1)
    }

    /// `true` if the configuration DIP switch is set.
    pub fn get_config_mode(&self) -> Result<bool, DriverError> {
        let mut state = 0u8;
        translate(self.api.get_config_enabled(&mut state))?;
        Ok(state == 1)
    }

    /// `true` on supply failure.
    pub fn get_power_fail(&self) -> Result<bool, DriverError> {
        let mut state = 0u8;
        translate(self.api.get_power_fail(&mut state))?;
        Ok(state == 1)
    }

    /// `true` on external failure.
    pub fn get_ext_fail(&self) -> Result<bool, DriverError> {
        let mut state = 0u8;
        translate(self.api.get_ext_fail(&mut state))?;
        Ok(state == 1)
    }

    /// Drive the external reset line.
    pub fn set_ext_reset(&self, state: bool) -> Result<(), DriverError> {
        translate(self.api.set_ext_reset(u8::from(state)))
    }

    // ─── Interrupts ─────────────────────────────────────────────────

    /// Subscribe `handler` to interrupts of `channel`.
    ///
    /// The native side is always armed for both edges; `rising` / `falling`
    /// are recorded in the log only, edge filtering happens in the node.
    /// The handle keeps `handler` until [`unregister_interrupt`](Self::unregister_interrupt).
    pub fn register_interrupt(
        &self,
        channel: u8,
        rising: bool,
        falling: bool,
        handler: InterruptHandler,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let requested = TriggerMask::from_edges(rising, falling);
        translate(self.api.register_interrupt_callback(
            channel,
            Arc::clone(&handler),
            TriggerMask::all().bits(),
        ))?;
        debug!(channel, ?requested, "Interrupt registered");
        state.subscriptions.insert(channel, handler);
        Ok(())
    }

    /// Drop the subscription of `channel`.
    ///
    /// The stored handler is released only after the native side has
    /// forgotten it.
    pub fn unregister_interrupt(&self, channel: u8) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let result = translate(self.api.unregister_interrupt_callback(channel));
        state.subscriptions.remove(&channel);
        debug!(channel, "Interrupt unregistered");
        result
    }

    /// `true` while a handler for `channel` is held.
    pub fn is_subscribed(&self, channel: u8) -> bool {
        self.state.lock().subscriptions.contains_key(&channel)
    }
}

impl std::fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DriverHandle")
            .field("backend", &self.api.name())
            .field("instances", &state.instances)
            .field("subscriptions", &state.subscriptions.len())
            .finish()
    }
}
