//! Native status-code translation.
//!
//! Every driver entry point returns an `i32`; zero means success and any
//! other value is mapped through a fixed table onto [`DriverError`].

use thiserror::Error;

/// Error reported by the native driver library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError {
    /// 0xFF
    #[error("Generic error")]
    Generic,
    /// 0xFE
    #[error("Not implemented")]
    NotImplemented,
    /// 0xFD
    #[error("Invalid parameter")]
    InvalidParameter,
    /// 0xFC
    #[error("Invalid channel")]
    InvalidChannel,
    /// 0xFB
    #[error("Invalid mode")]
    InvalidMode,
    /// 0xFA
    #[error("Invalid timebase")]
    InvalidTimebase,
    /// 0xF9
    #[error("Invalid delta")]
    InvalidDelta,
    /// 0xF8
    #[error("PTO tab is full")]
    PtoTableFull,
    /// 0xF7
    #[error("Access to device failed")]
    DeviceAccessFailed,
    /// 0xF6
    #[error("Process image configuration invalid")]
    ProcessImageConfigInvalid,
    /// 0xF5
    #[error("Process image configuration unknown")]
    ProcessImageConfigUnknown,
    /// 0xF4
    #[error("Shared process image error")]
    SharedProcessImage,
    /// 0xF3
    #[error("Address out of range")]
    AddressOutOfRange,
    /// 0xF2
    #[error("Watchdog timeout")]
    WatchdogTimeout,
    /// Any code outside the table.
    #[error("Unknown error code :{0}")]
    Unknown(i32),
}

impl DriverError {
    /// Map a non-zero native status code.
    pub fn from_code(code: i32) -> Self {
        match code {
            0xFF => Self::Generic,
            0xFE => Self::NotImplemented,
            0xFD => Self::InvalidParameter,
            0xFC => Self::InvalidChannel,
            0xFB => Self::InvalidMode,
            0xFA => Self::InvalidTimebase,
            0xF9 => Self::InvalidDelta,
            0xF8 => Self::PtoTableFull,
            0xF7 => Self::DeviceAccessFailed,
            0xF6 => Self::ProcessImageConfigInvalid,
            0xF5 => Self::ProcessImageConfigUnknown,
            0xF4 => Self::SharedProcessImage,
            0xF3 => Self::AddressOutOfRange,
            0xF2 => Self::WatchdogTimeout,
            other => Self::Unknown(other),
        }
    }

    /// Native status code of this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::Generic => 0xFF,
            Self::NotImplemented => 0xFE,
            Self::InvalidParameter => 0xFD,
            Self::InvalidChannel => 0xFC,
            Self::InvalidMode => 0xFB,
            Self::InvalidTimebase => 0xFA,
            Self::InvalidDelta => 0xF9,
            Self::PtoTableFull => 0xF8,
            Self::DeviceAccessFailed => 0xF7,
            Self::ProcessImageConfigInvalid => 0xF6,
            Self::ProcessImageConfigUnknown => 0xF5,
            Self::SharedProcessImage => 0xF4,
            Self::AddressOutOfRange => 0xF3,
            Self::WatchdogTimeout => 0xF2,
            Self::Unknown(code) => *code,
        }
    }
}

/// Translate a native status code: `0` is success.
#[inline]
pub fn translate(code: i32) -> Result<(), DriverError> {
    if code == 0 {
        Ok(())
    } else {
        Err(DriverError::from_code(code))
    }
}
