//! Board layout and runtime defaults for the CTR-700.
//!
//! Single source of truth for channel counts and default timings.

/// Number of physical digital inputs.
pub const DI_CHANNELS: usize = 16;

/// Number of transistor digital outputs.
pub const DO_CHANNELS: usize = 16;

/// Number of relay outputs.
pub const RELAY_CHANNELS: usize = 2;

/// First digital-output channel number routed to a relay (16 -> relay 0).
pub const RELAY_CHANNEL_BASE: u8 = DO_CHANNELS as u8;

/// Highest accepted digital-output channel number (last relay).
pub const DO_CHANNEL_MAX: u8 = RELAY_CHANNEL_BASE + RELAY_CHANNELS as u8 - 1;

/// Number of analog inputs.
pub const AI_CHANNELS: usize = 4;

/// Virtual interrupt channel of the run/stop switch.
pub const RUN_SWITCH_CHANNEL: u8 = 0x80;

/// Raw ADC span used to derive the digit value.
pub const ADC_FULL_SCALE: f64 = 32768.0;

/// Factor between the user delta (12-bit units) and the native ADC value.
pub const DELTA_SCALE: i32 = 8;

/// Reference value before the first analog sample; guarantees the first
/// sample is published.
pub const INITIAL_LAST_ADC: i32 = -32768;

/// Default "Altered" -> "Settled" debounce period.
pub const DEFAULT_STATUS_PERIOD_MS: u64 = 1000;

/// Default upper bound for one blocking wait of the event loop.
pub const DEFAULT_IDLE_TICK_MS: u64 = 50;

/// Default watchdog service interval.
pub const DEFAULT_WATCHDOG_SERVICE_MS: u64 = 250;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ctr700/ctr700.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relays_follow_transistor_outputs() {
        assert_eq!(RELAY_CHANNEL_BASE, 16);
        assert_eq!(DO_CHANNEL_MAX, 17);
    }

    #[test]
    fn run_switch_is_outside_physical_inputs() {
        assert!(usize::from(RUN_SWITCH_CHANNEL) >= DI_CHANNELS);
    }

    #[test]
    fn initial_reference_forces_first_publish() {
        // Any raw u16 sample differs from the initial reference by at least 32768.
        assert!((0 - INITIAL_LAST_ADC) >= 32768);
    }
}
