//! Native driver entry points.
//!
//! This module defines:
//! - `NativeApi` trait - one method per `Ctr700Drv*` entry point
//! - `InterruptHandler` type alias - callback stored per interrupt channel
//! - `BackendFactory` type alias - factory function for a backend
//!
//! Methods mirror the C ABI one to one: scalars in, out-parameters by
//! mutable reference, an `i32` status code back. Translating that code is
//! the caller's job (see [`crate::hal::error::translate`]).

use std::sync::Arc;

use crate::config::AppConfig;
use crate::hal::types::{RawDiagnosticInfo, RawHardwareInfo};

/// Interrupt callback: `(channel, value)`.
///
/// May be invoked from any thread; implementations must only hand the
/// notification off and return.
pub type InterruptHandler = Arc<dyn Fn(u8, u8) + Send + Sync>;

/// Factory function type for creating backend instances.
///
/// Backends pick what they need from the application config; the native
/// backend ignores it.
pub type BackendFactory = fn(&AppConfig) -> Arc<dyn NativeApi>;

/// The `libctr700drv` surface.
///
/// # Threading
///
/// Calls are issued from the event-loop thread only. Interrupt handlers
/// registered through [`NativeApi::register_interrupt_callback`] may run on
/// a driver-owned thread.
pub trait NativeApi: Send + Sync {
    /// Backend identifier (e.g., "simulation", "native").
    fn name(&self) -> &'static str;

    /// `Ctr700DrvGetVersion`
    fn get_version(&self, major: &mut u8, minor: &mut u8) -> i32;
    /// `Ctr700DrvInitialize`
    fn initialize(&self) -> i32;
    /// `Ctr700DrvShutDown`
    fn shut_down(&self) -> i32;
    /// `Ctr700DrvGetTickCount`
    fn get_tick_count(&self, ticks: &mut u32) -> i32;
    /// `Ctr700DrvEnableWatchdog`
    fn enable_watchdog(&self, monitor_only: u8) -> i32;
    /// `Ctr700DrvServiceWatchdog`
    fn service_watchdog(&self) -> i32;
    /// `Ctr700DrvGetHardwareInfo`
    fn get_hardware_info(&self, info: &mut RawHardwareInfo) -> i32;

    /// `Ctr700DrvSetRunLed`
    fn set_run_led(&self, state: u8) -> i32;
    /// `Ctr700DrvSetErrLed`
    fn set_err_led(&self, state: u8) -> i32;
    /// `Ctr700DrvGetRunSwitch`
    fn get_run_switch(&self, state: &mut u8) -> i32;
    /// `Ctr700DrvGetConfigEnabled`
    fn get_config_enabled(&self, state: &mut u8) -> i32;
    /// `Ctr700DrvGetPowerFail`
    fn get_power_fail(&self, state: &mut u8) -> i32;
    /// `Ctr700DrvGetDiagInfo`
    fn get_diag_info(&self, info: &mut RawDiagnosticInfo) -> i32;
    /// `Ctr700DrvGetExtFail`
    fn get_ext_fail(&self, state: &mut u8) -> i32;
    /// `Ctr700DrvSetExtReset`
    fn set_ext_reset(&self, state: u8) -> i32;

    /// `Ctr700DrvGetDigiIn`
    fn get_digi_in(&self, channel: u8, state: &mut u8) -> i32;
    /// `Ctr700DrvSetDigiOut`
    fn set_digi_out(&self, channel: u8, state: u8) -> i32;
    /// `Ctr700DrvSetRelay`
    fn set_relay(&self, channel: u8, state: u8) -> i32;

    /// `Ctr700DrvAdcGetValue`
    fn adc_get_value(&self, channel: u8, value: &mut u16) -> i32;
    /// `Ctr700DrvAdcSetMode`
    fn adc_set_mode(&self, channel: u8, mode: u8) -> i32;
    /// `Ctr700DrvTmpGetValue`
    fn tmp_get_value(&self, channel: u8, value: &mut u32) -> i32;

    /// `Ctr700DrvPwmSetTimeBase`
    fn pwm_set_time_base(&self, channel: u8, time_base: u8) -> i32;
    /// `Ctr700DrvPwmSetParam`
    fn pwm_set_param(&self, channel: u8, period: u32, duty: u32) -> i32;
    /// `Ctr700DrvPwmEnable`
    fn pwm_enable(&self, channel: u8, enable: u8) -> i32;

    /// `Ctr700DrvRegisterInterruptCallback`
    ///
    /// The backend keeps `handler` alive until the matching unregister.
    fn register_interrupt_callback(
        &self,
        channel: u8,
        handler: InterruptHandler,
        trigger: u32,
    ) -> i32;
    /// `Ctr700DrvUnregisterInterruptCallback`
    fn unregister_interrupt_callback(&self, channel: u8) -> i32;
}
