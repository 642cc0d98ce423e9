//! Raw bindings to `libctr700drv`.
//!
//! Every entry point returns a status byte widened to `i32`; zero is
//! success.

use ctr700_common::hal::types::{RawDiagnosticInfo, RawHardwareInfo};

/// Interrupt callback: `(channel, value)`.
pub type Ctr700DrvIrqCallback = Option<extern "C" fn(channel: u8, value: u8)>;

#[link(name = "ctr700drv")]
unsafe extern "C" {
    pub fn Ctr700DrvGetVersion(major: *mut u8, minor: *mut u8) -> i32;
    pub fn Ctr700DrvInitialize() -> i32;
    pub fn Ctr700DrvShutDown() -> i32;
    pub fn Ctr700DrvGetTickCount(ticks: *mut u32) -> i32;
    pub fn Ctr700DrvEnableWatchdog(monitor_only: u8) -> i32;
    pub fn Ctr700DrvServiceWatchdog() -> i32;
    pub fn Ctr700DrvGetHardwareInfo(info: *mut RawHardwareInfo) -> i32;

    pub fn Ctr700DrvSetRunLed(state: u8) -> i32;
    pub fn Ctr700DrvSetErrLed(state: u8) -> i32;
    pub fn Ctr700DrvGetRunSwitch(state: *mut u8) -> i32;
    pub fn Ctr700DrvGetConfigEnabled(state: *mut u8) -> i32;
    pub fn Ctr700DrvGetPowerFail(state: *mut u8) -> i32;
    pub fn Ctr700DrvGetDiagInfo(info: *mut RawDiagnosticInfo) -> i32;
    pub fn Ctr700DrvGetExtFail(state: *mut u8) -> i32;
    pub fn Ctr700DrvSetExtReset(state: u8) -> i32;

    pub fn Ctr700DrvGetDigiIn(channel: u8, state: *mut u8) -> i32;
    pub fn Ctr700DrvSetDigiOut(channel: u8, state: u8) -> i32;
    pub fn Ctr700DrvSetRelay(channel: u8, state: u8) -> i32;

    pub fn Ctr700DrvAdcGetValue(channel: u8, value: *mut u16) -> i32;
    pub fn Ctr700DrvAdcSetMode(channel: u8, mode: u8) -> i32;
    pub fn Ctr700DrvTmpGetValue(channel: u8, value: *mut u32) -> i32;

    pub fn Ctr700DrvPwmSetTimeBase(channel: u8, time_base: u8) -> i32;
    pub fn Ctr700DrvPwmSetParam(channel: u8, period: u32, duty: u32) -> i32;
    pub fn Ctr700DrvPwmEnable(channel: u8, enable: u8) -> i32;

    pub fn Ctr700DrvRegisterInterruptCallback(
        channel: u8,
        callback: Ctr700DrvIrqCallback,
        trigger: u32,
    ) -> i32;
    pub fn Ctr700DrvUnregisterInterruptCallback(channel: u8) -> i32;
}
