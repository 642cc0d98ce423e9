//! Native backend over the vendor library.
//!
//! Built only with the `hardware` feature; the crate then links against
//! `libctr700drv`.
//!
//! The C interrupt callback carries no user context, so handlers live in
//! a process-wide table keyed by channel and a single trampoline looks
//! them up.

#![allow(non_snake_case)]

mod sys;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use ctr700_common::config::AppConfig;
use ctr700_common::hal::driver::{InterruptHandler, NativeApi};
use ctr700_common::hal::types::{RawDiagnosticInfo, RawHardwareInfo};

static HANDLERS: LazyLock<RwLock<HashMap<u8, InterruptHandler>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

extern "C" fn interrupt_trampoline(channel: u8, value: u8) {
    // Clone out of the table so the lock is not held while the handler runs.
    let handler = HANDLERS.read().get(&channel).cloned();
    if let Some(handler) = handler {
        handler(channel, value);
    }
}

/// `libctr700drv` as a [`NativeApi`].
#[derive(Debug, Default)]
pub struct NativeBoard;

/// Factory registered as `"native"`.
pub fn create_backend(_config: &AppConfig) -> Arc<dyn NativeApi> {
    Arc::new(NativeBoard)
}

// SAFETY (applies to every call below): the library is safe to call from
// any thread after `Ctr700DrvInitialize`, and before it every entry point
// fails with a status code instead of touching memory. Out-pointers come
// from live `&mut` references of the exact C type.
impl NativeApi for NativeBoard {
    fn name(&self) -> &'static str {
        "native"
    }

    fn get_version(&self, major: &mut u8, minor: &mut u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvGetVersion(major, minor) }
    }

    fn initialize(&self) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvInitialize() }
    }

    fn shut_down(&self) -> i32 {
        // SAFETY: see impl comment.
        let status = unsafe { sys::Ctr700DrvShutDown() };
        HANDLERS.write().clear();
        status
    }

    fn get_tick_count(&self, ticks: &mut u32) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvGetTickCount(ticks) }
    }

    fn enable_watchdog(&self, monitor_only: u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvEnableWatchdog(monitor_only) }
    }

    fn service_watchdog(&self) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvServiceWatchdog() }
    }

    fn get_hardware_info(&self, info: &mut RawHardwareInfo) -> i32 {
        // SAFETY: `RawHardwareInfo` is `repr(C)` with the library's layout.
        unsafe { sys::Ctr700DrvGetHardwareInfo(info) }
    }

    fn set_run_led(&self, state: u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvSetRunLed(state) }
    }

    fn set_err_led(&self, state: u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvSetErrLed(state) }
    }

    fn get_run_switch(&self, state: &mut u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvGetRunSwitch(state) }
    }

    fn get_config_enabled(&self, state: &mut u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvGetConfigEnabled(state) }
    }

    fn get_power_fail(&self, state: &mut u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvGetPowerFail(state) }
    }

    fn get_diag_info(&self, info: &mut RawDiagnosticInfo) -> i32 {
        // SAFETY: `RawDiagnosticInfo` is `repr(C)` with the library's layout.
        unsafe { sys::Ctr700DrvGetDiagInfo(info) }
    }

    fn get_ext_fail(&self, state: &mut u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvGetExtFail(state) }
    }

    fn set_ext_reset(&self, state: u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvSetExtReset(state) }
    }

    fn get_digi_in(&self, channel: u8, state: &mut u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvGetDigiIn(channel, state) }
    }

    fn set_digi_out(&self, channel: u8, state: u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvSetDigiOut(channel, state) }
    }

    fn set_relay(&self, channel: u8, state: u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvSetRelay(channel, state) }
    }

    fn adc_get_value(&self, channel: u8, value: &mut u16) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvAdcGetValue(channel, value) }
    }

    fn adc_set_mode(&self, channel: u8, mode: u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvAdcSetMode(channel, mode) }
    }

    fn tmp_get_value(&self, channel: u8, value: &mut u32) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvTmpGetValue(channel, value) }
    }

    fn pwm_set_time_base(&self, channel: u8, time_base: u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvPwmSetTimeBase(channel, time_base) }
    }

    fn pwm_set_param(&self, channel: u8, period: u32, duty: u32) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvPwmSetParam(channel, period, duty) }
    }

    fn pwm_enable(&self, channel: u8, enable: u8) -> i32 {
        // SAFETY: see impl comment.
        unsafe { sys::Ctr700DrvPwmEnable(channel, enable) }
    }

    fn register_interrupt_callback(
        &self,
        channel: u8,
        handler: InterruptHandler,
        trigger: u32,
    ) -> i32 {
        // Stored first: the library may fire before registration returns.
        let previous = HANDLERS.write().insert(channel, handler);
        // SAFETY: the trampoline is a plain `extern "C"` function that lives
        // for the whole process.
        let status = unsafe {
            sys::Ctr700DrvRegisterInterruptCallback(channel, Some(interrupt_trampoline), trigger)
        };
        if status != 0 {
            let mut handlers = HANDLERS.write();
            match previous {
                Some(previous) => handlers.insert(channel, previous),
                None => handlers.remove(&channel),
            };
        }
        status
    }

    fn unregister_interrupt_callback(&self, channel: u8) -> i32 {
        // SAFETY: see impl comment.
        let status = unsafe { sys::Ctr700DrvUnregisterInterruptCallback(channel) };
        // Dropped only after the library stopped calling the trampoline.
        HANDLERS.write().remove(&channel);
        status
    }
}
