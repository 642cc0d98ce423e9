//! Native-boundary data types.
//!
//! - `RawHardwareInfo` / `RawDiagnosticInfo` - fixed-layout structs filled by the driver
//! - `HardwareInfo` / `DiagnosticInfo` / `DriverVersion` - plain records handed to callers
//! - `AnalogMode` - ADC measurement mode
//! - `TriggerMask` - interrupt edge selection

use bitflags::bitflags;
use serde::Serialize;
use static_assertions::const_assert_eq;
use std::fmt;

use crate::hal::consts::{ADC_MODE_CURRENT, ADC_MODE_VOLTAGE};

/// Hardware description as laid out by `Ctr700DrvGetHardwareInfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawHardwareInfo {
    /// PCB revision.
    pub pcb_revision: u8,
    /// Digital inputs.
    pub di_channels: u16,
    /// Digital outputs.
    pub do_channels: u16,
    /// Relay outputs.
    pub relay_channels: u16,
    /// Analog inputs.
    pub ai_channels: u16,
    /// Analog outputs.
    pub ao_channels: u16,
    /// Counter inputs.
    pub cnt_channels: u16,
    /// Encoder inputs.
    pub enc_channels: u16,
    /// PWM outputs.
    pub pwm_channels: u16,
    /// Temperature sensors.
    pub tmp_channels: u16,
}

/// Diagnostic flags as laid out by `Ctr700DrvGetDiagInfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawDiagnosticInfo {
    /// Digital-output supply failure.
    pub digi_out_power_fail: u8,
    /// Digital-output driver diagnostic.
    pub digi_out_diag: u8,
    /// Digital-input error.
    pub digi_in_error: u8,
    /// USB over-current.
    pub usb_over_current: u8,
}

// u8 followed by nine naturally aligned u16 fields.
const_assert_eq!(std::mem::size_of::<RawHardwareInfo>(), 20);
const_assert_eq!(std::mem::align_of::<RawHardwareInfo>(), 2);
const_assert_eq!(std::mem::size_of::<RawDiagnosticInfo>(), 4);

/// Hardware description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HardwareInfo {
    /// PCB revision.
    pub pcb_revision: u8,
    /// Digital inputs.
    pub di_channels: u16,
    /// Digital outputs.
    pub do_channels: u16,
    /// Relay outputs.
    pub relay_channels: u16,
    /// Analog inputs.
    pub ai_channels: u16,
    /// Analog outputs.
    pub ao_channels: u16,
    /// Counter inputs.
    pub cnt_channels: u16,
    /// Encoder inputs.
    pub enc_channels: u16,
    /// PWM outputs.
    pub pwm_channels: u16,
    /// Temperature sensors.
    pub tmp_channels: u16,
}

impl From<RawHardwareInfo> for HardwareInfo {
    fn from(raw: RawHardwareInfo) -> Self {
        Self {
            pcb_revision: raw.pcb_revision,
            di_channels: raw.di_channels,
            do_channels: raw.do_channels,
            relay_channels: raw.relay_channels,
            ai_channels: raw.ai_channels,
            ao_channels: raw.ao_channels,
            cnt_channels: raw.cnt_channels,
            enc_channels: raw.enc_channels,
            pwm_channels: raw.pwm_channels,
            tmp_channels: raw.tmp_channels,
        }
    }
}

/// Board diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosticInfo {
    /// Digital-output supply failure.
    pub digital_out_power_fail: u8,
    /// Digital-output driver diagnostic.
    pub digital_out_diag: u8,
    /// Digital-input error.
    pub digital_in_error: u8,
    /// USB over-current.
    pub usb_over_current: u8,
}

impl From<RawDiagnosticInfo> for DiagnosticInfo {
    fn from(raw: RawDiagnosticInfo) -> Self {
        Self {
            digital_out_power_fail: raw.digi_out_power_fail,
            digital_out_diag: raw.digi_out_diag,
            digital_in_error: raw.digi_in_error,
            usb_over_current: raw.usb_over_current,
        }
    }
}

/// Driver library version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// ADC measurement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogMode {
    /// 0..10 V.
    Voltage,
    /// 0..20 mA.
    Current,
}

impl AnalogMode {
    /// Native `AdcSetMode` code.
    pub fn code(self) -> u8 {
        match self {
            Self::Voltage => ADC_MODE_VOLTAGE,
            Self::Current => ADC_MODE_CURRENT,
        }
    }
}

bitflags! {
    /// Edge selection passed to `RegisterInterruptCallback`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TriggerMask: u32 {
        /// Low -> high transition.
        const RISING = 0x01;
        /// High -> low transition.
        const FALLING = 0x02;
    }
}

impl TriggerMask {
    /// Build a mask from two edge flags.
    pub fn from_edges(rising: bool, falling: bool) -> Self {
        let mut mask = Self::empty();
        mask.set(Self::RISING, rising);
        mask.set(Self::FALLING, falling);
        mask
    }
}
