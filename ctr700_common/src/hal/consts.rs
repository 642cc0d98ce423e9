//! Native ABI constants of `libctr700drv`.

/// Canonical backend library name (used for linking and logging).
pub const NATIVE_LIBRARY: &str = "ctr700drv";

/// `AdcSetMode` code selecting voltage measurement.
pub const ADC_MODE_VOLTAGE: u8 = 0;

/// `AdcSetMode` code selecting current measurement.
pub const ADC_MODE_CURRENT: u8 = 1;

/// PWM time base written before the PWM parameters.
pub const PWM_TIME_BASE: u8 = 2;

/// Status code for success.
pub const STATUS_OK: i32 = 0;
