//! Analog input value processing.
//!
//! Raw ADC samples are 15-bit (`0..=32768`). A sample is forwarded only if
//! it differs from the last forwarded one by at least the delta threshold;
//! forwarded samples are scaled linearly into engineering units, optionally
//! rounded to a fixed number of decimals and encoded as number or text.

use crate::consts::{ADC_FULL_SCALE, DELTA_SCALE, INITIAL_LAST_ADC};
use crate::hal::types::AnalogMode;
use crate::node::ChannelError;
use crate::node::config::AnalogInputConfig;
use crate::node::payload::{
    format_number, parse_float_prefix, parse_int_prefix, Payload, TypedLiteral, ValueType,
};

/// Sample unit selecting seconds; anything else means milliseconds.
pub const SAMPLE_UNIT_SECONDS: &str = "SAMPLE_UNIT_S";

/// ADC mode from its configured name.
///
/// The `*_USER` variants select the same hardware mode as their base.
pub fn parse_mode(mode: &str) -> Result<AnalogMode, ChannelError> {
    match mode {
        "MODE_VOLTAGE" | "MODE_VOLTAGE_USER" => Ok(AnalogMode::Voltage),
        "MODE_CURRENT" | "MODE_CURRENT_USER" => Ok(AnalogMode::Current),
        other => Err(ChannelError::ConfigurationInvalid(format!(
            "unknown analog mode '{other}'"
        ))),
    }
}

/// Sample period in milliseconds.
pub fn sample_period_ms(rate: &str, unit: &str) -> Result<u64, ChannelError> {
    if rate.is_empty() || unit.is_empty() {
        return Err(ChannelError::ConfigurationInvalid(
            "sample rate and unit are required".to_string(),
        ));
    }
    let rate = parse_int_prefix(rate).ok_or_else(|| {
        ChannelError::ConfigurationInvalid(format!("sample rate '{rate}' is not a number"))
    })?;
    let period = if unit == SAMPLE_UNIT_SECONDS {
        rate.saturating_mul(1000)
    } else {
        rate
    };
    u64::try_from(period)
        .ok()
        .filter(|&p| p > 0)
        .ok_or_else(|| ChannelError::ConfigurationInvalid(format!("sample rate {period} ms <= 0")))
}

/// Rounding applied to processed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalPlaces {
    /// Fixed number of decimals (0..=3).
    Fixed(usize),
    /// Unrounded.
    Full,
}

impl DecimalPlaces {
    /// Parse `DECPLCE_0..3`; `DECPLCE_ALL` and unknown selectors mean full
    /// precision.
    pub fn parse(selector: &str) -> Self {
        match selector {
            "DECPLCE_0" => Self::Fixed(0),
            "DECPLCE_1" => Self::Fixed(1),
            "DECPLCE_2" => Self::Fixed(2),
            "DECPLCE_3" => Self::Fixed(3),
            _ => Self::Full,
        }
    }
}

/// Linear raw -> engineering mapping of one analog channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveValueMapping {
    /// Engineering value at raw 0.
    pub lower_value: f64,
    /// Engineering value at raw 32768.
    pub upper_value: f64,
    /// Engineering units per raw count.
    pub digit_value: f64,
    /// Minimum raw change before a sample is forwarded (already x8).
    pub delta_threshold: i32,
    /// Rounding.
    pub decimal_places: DecimalPlaces,
    /// Output encoding (type of the upper value).
    pub encoding: ValueType,
}

impl ActiveValueMapping {
    /// Validate and derive a mapping from configured strings.
    pub fn new(
        upper: &TypedLiteral,
        lower: &TypedLiteral,
        delta: &str,
        decimal_places: &str,
    ) -> Result<Self, ChannelError> {
        let delta = parse_int_prefix(delta)
            .and_then(|d| i32::try_from(d).ok())
            .ok_or_else(|| {
                ChannelError::ConfigurationInvalid(format!("delta '{delta}' is not a number"))
            })?;
        let upper_value = parse_float_prefix(&upper.data).ok_or_else(|| {
            ChannelError::ConfigurationInvalid(format!("upper value '{}' is not a number", upper.data))
        })?;
        let lower_value = parse_float_prefix(&lower.data).ok_or_else(|| {
            ChannelError::ConfigurationInvalid(format!("lower value '{}' is not a number", lower.data))
        })?;
        if upper.value_type == ValueType::Bool {
            return Err(ChannelError::ConfigurationInvalid(
                "analog values encode as num or str".to_string(),
            ));
        }

        Ok(Self {
            lower_value,
            upper_value,
            digit_value: (upper_value - lower_value) / ADC_FULL_SCALE,
            delta_threshold: delta.saturating_mul(DELTA_SCALE),
            decimal_places: DecimalPlaces::parse(decimal_places),
            encoding: upper.value_type,
        })
    }

    /// `raw * digit_value + lower_value`
    pub fn process_value(&self, raw: u16) -> f64 {
        f64::from(raw) * self.digit_value + self.lower_value
    }

    /// Fixed-decimal text of a processed value, `None` for full precision.
    ///
    /// Ties round away from zero (`2.5` -> `"3"`).
    pub fn format(&self, value: f64) -> Option<String> {
        match self.decimal_places {
            DecimalPlaces::Fixed(places) => {
                let scale = 10f64.powi(places as i32);
                let rounded = (value * scale).round() / scale;
                Some(format!("{rounded:.places$}"))
            }
            DecimalPlaces::Full => None,
        }
    }

    /// Payload for a forwarded raw sample.
    pub fn encode(&self, raw: u16) -> Payload {
        let value = self.process_value(raw);
        let fixed = self.format(value);
        match (self.encoding, fixed) {
            (ValueType::Str, Some(text)) => Payload::Text(text),
            (ValueType::Str, None) => Payload::Text(format_number(value)),
            (_, Some(text)) => Payload::Number(
                parse_float_prefix(&text.replace(',', ".")).unwrap_or(value),
            ),
            (_, None) => Payload::Number(value),
        }
    }
}

/// Delta-threshold filter on raw samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaFilter {
    threshold: i32,
    last_published: i32,
}

impl DeltaFilter {
    /// Filter with a raw-domain threshold.
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold,
            last_published: INITIAL_LAST_ADC,
        }
    }

    /// `true` if `raw` should be forwarded; updates the reference on accept.
    pub fn accept(&mut self, raw: u16) -> bool {
        let raw = i32::from(raw);
        if (raw - self.last_published).abs() < self.threshold {
            return false;
        }
        self.last_published = raw;
        true
    }

    /// Raw value of the last forwarded sample.
    pub fn last_published(&self) -> i32 {
        self.last_published
    }
}

/// Validated settings of an analog input node.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogSettings {
    /// ADC mode.
    pub mode: AnalogMode,
    /// Sample period.
    pub period_ms: u64,
    /// Value mapping.
    pub mapping: ActiveValueMapping,
}

impl AnalogSettings {
    /// Validate an analog node configuration.
    ///
    /// `unit_1000` is accepted but does not influence scaling.
    pub fn from_config(config: &AnalogInputConfig) -> Result<Self, ChannelError> {
        Ok(Self {
            mode: parse_mode(&config.mode)?,
            period_ms: sample_period_ms(&config.sample_rate, &config.sample_unit)?,
            mapping: ActiveValueMapping::new(
                &config.upper,
                &config.lower,
                &config.delta,
                &config.decimal_places,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(places: &str, encoding: ValueType) -> ActiveValueMapping {
        ActiveValueMapping::new(
            &TypedLiteral::new(encoding, "10.0"),
            &TypedLiteral::new(ValueType::Num, "0.0"),
            "0",
            places,
        )
        .unwrap()
    }

    #[test]
    fn scaling_half_range() {
        let m = mapping("DECPLCE_ALL", ValueType::Num);
        assert!((m.digit_value - 10.0 / 32768.0).abs() < 1e-12);
        assert!((m.process_value(16384) - 5.0).abs() < 1e-9);
        assert_eq!(m.encode(16384), Payload::Number(5.0));
    }

    #[test]
    fn fixed_decimals() {
        let m = mapping("DECPLCE_2", ValueType::Str);
        assert_eq!(m.format(5.0).as_deref(), Some("5.00"));
        assert_eq!(m.encode(16384), Payload::Text("5.00".into()));

        let m = mapping("DECPLCE_1", ValueType::Num);
        // 1000 * 10/32768 = 0.3051...
        assert_eq!(m.encode(1000), Payload::Number(0.3));
    }

    #[test]
    fn ties_round_away_from_zero() {
        let m = ActiveValueMapping::new(
            &TypedLiteral::new(ValueType::Num, "20"),
            &TypedLiteral::new(ValueType::Num, "0"),
            "0",
            "DECPLCE_0",
        )
        .unwrap();
        // 4096 * 20/32768 = 2.5 exactly
        assert_eq!(m.format(2.5).as_deref(), Some("3"));
        assert_eq!(m.encode(4096), Payload::Number(3.0));
        assert_eq!(m.format(-2.5).as_deref(), Some("-3"));

        let m = mapping("DECPLCE_1", ValueType::Str);
        assert_eq!(m.format(0.25).as_deref(), Some("0.3"));
        assert_eq!(m.format(1.75).as_deref(), Some("1.8"));
        assert_eq!(m.format(0.125).as_deref(), Some("0.1"));
    }

    #[test]
    fn unrounded_text() {
        let m = mapping("DECPLCE_ALL", ValueType::Str);
        assert_eq!(m.encode(16384), Payload::Text("5".into()));
    }

    #[test]
    fn delta_is_scaled_by_eight() {
        let m = ActiveValueMapping::new(
            &TypedLiteral::new(ValueType::Num, "10"),
            &TypedLiteral::new(ValueType::Num, "0"),
            "4",
            "DECPLCE_0",
        )
        .unwrap();
        assert_eq!(m.delta_threshold, 32);
    }

    #[test]
    fn delta_filter() {
        let mut filter = DeltaFilter::new(80);
        assert!(filter.accept(0), "first sample always passes");
        assert_eq!(filter.last_published(), 0);

        assert!(!filter.accept(79));
        assert_eq!(filter.last_published(), 0);

        assert!(filter.accept(80));
        assert_eq!(filter.last_published(), 80);

        assert!(!filter.accept(1));
        assert!(filter.accept(0));
    }

    #[test]
    fn invalid_numbers_rejected() {
        let err = ActiveValueMapping::new(
            &TypedLiteral::new(ValueType::Num, "ten"),
            &TypedLiteral::new(ValueType::Num, "0"),
            "1",
            "DECPLCE_0",
        );
        assert!(matches!(err, Err(ChannelError::ConfigurationInvalid(_))));

        let err = ActiveValueMapping::new(
            &TypedLiteral::new(ValueType::Num, "10"),
            &TypedLiteral::new(ValueType::Num, "0"),
            "",
            "DECPLCE_0",
        );
        assert!(matches!(err, Err(ChannelError::ConfigurationInvalid(_))));
    }

    #[test]
    fn sample_period_units() {
        assert_eq!(sample_period_ms("2", SAMPLE_UNIT_SECONDS).unwrap(), 2000);
        assert_eq!(sample_period_ms("250", "SAMPLE_UNIT_MS").unwrap(), 250);
        assert!(sample_period_ms("0", "SAMPLE_UNIT_MS").is_err());
        assert!(sample_period_ms("-1", SAMPLE_UNIT_SECONDS).is_err());
        assert!(sample_period_ms("fast", "SAMPLE_UNIT_MS").is_err());
        assert!(sample_period_ms("10", "").is_err());
    }

    #[test]
    fn modes() {
        assert_eq!(parse_mode("MODE_CURRENT_USER").unwrap(), AnalogMode::Current);
        assert_eq!(parse_mode("MODE_VOLTAGE").unwrap(), AnalogMode::Voltage);
        assert!(parse_mode("MODE_RESISTANCE").is_err());
    }

    #[test]
    fn decimal_selectors() {
        assert_eq!(DecimalPlaces::parse("DECPLCE_3"), DecimalPlaces::Fixed(3));
        assert_eq!(DecimalPlaces::parse("DECPLCE_ALL"), DecimalPlaces::Full);
        assert_eq!(DecimalPlaces::parse("DECPLCE_9"), DecimalPlaces::Full);
    }
}
