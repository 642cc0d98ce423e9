//! Message payloads and the Active/Inactive value mapping.
//!
//! Payloads are a tagged union instead of a dynamically typed value; the
//! mapping encodes a boolean channel state into one of two configured
//! literals and decodes an inbound payload back by its runtime type.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Value carried by an inbound or outbound message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// `true` / `false`
    Bool(bool),
    /// Any number; integral values serialize without a fraction.
    Number(f64),
    /// Free text.
    Text(String),
}

impl Payload {
    /// Text form used when comparing against configured literals.
    pub fn to_literal(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => match as_exact_integer(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One message on the host side: `{ topic, payload }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Normalized topic.
    pub topic: String,
    /// Value.
    pub payload: Payload,
}

impl Message {
    /// Build a message.
    pub fn new(topic: impl Into<String>, payload: Payload) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

/// Configured literal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Boolean literal.
    Bool,
    /// Numeric literal.
    Num,
    /// String literal.
    Str,
}

/// A `(type, literal)` pair as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedLiteral {
    /// Literal type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Literal text.
    pub data: String,
}

impl TypedLiteral {
    /// Build a literal.
    pub fn new(value_type: ValueType, data: impl Into<String>) -> Self {
        Self {
            value_type,
            data: data.into(),
        }
    }

    /// Payload emitted for this literal.
    ///
    /// Numeric literals use their leading integer; a literal without one
    /// encodes as `0`.
    pub fn encode(&self) -> Payload {
        let data = self.data.to_lowercase();
        match self.value_type {
            ValueType::Bool => Payload::Bool(data == "true"),
            ValueType::Num => match parse_int_prefix(&data) {
                Some(n) => Payload::Number(n as f64),
                None => {
                    tracing::warn!(literal = %self.data, "numeric literal has no leading integer, using 0");
                    Payload::Number(0.0)
                }
            },
            ValueType::Str => Payload::Text(data),
        }
    }

    /// `true` if an inbound payload equals this literal.
    ///
    /// The payload's runtime type must match the literal type; strings
    /// compare case-insensitively.
    pub fn matches(&self, payload: &Payload) -> bool {
        let expected = self.data.to_lowercase();
        match (self.value_type, payload) {
            (ValueType::Bool, Payload::Bool(b)) => b.to_string() == expected,
            (ValueType::Num, Payload::Number(n)) => format_number(*n) == expected,
            (ValueType::Str, Payload::Text(s)) => s.to_lowercase() == expected,
            _ => false,
        }
    }
}

/// Two literals, one per boolean channel state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveInactiveMapping {
    /// Literal for `true`.
    pub active: TypedLiteral,
    /// Literal for `false`.
    pub inactive: TypedLiteral,
}

impl Default for ActiveInactiveMapping {
    fn default() -> Self {
        Self {
            active: TypedLiteral::new(ValueType::Bool, "true"),
            inactive: TypedLiteral::new(ValueType::Bool, "false"),
        }
    }
}

impl ActiveInactiveMapping {
    /// Build a mapping.
    pub fn new(active: TypedLiteral, inactive: TypedLiteral) -> Self {
        Self { active, inactive }
    }

    /// Payload for a channel state.
    pub fn encode(&self, state: bool) -> Payload {
        if state {
            self.active.encode()
        } else {
            self.inactive.encode()
        }
    }

    /// Channel state for an inbound payload, `None` if neither literal
    /// matches. The active literal is tested first.
    pub fn decode(&self, payload: &Payload) -> Option<bool> {
        if self.active.matches(payload) {
            Some(true)
        } else if self.inactive.matches(payload) {
            Some(false)
        } else {
            None
        }
    }
}

fn as_exact_integer(n: f64) -> Option<i64> {
    // 2^53: beyond this f64 no longer represents every integer.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        Some(n as i64)
    } else {
        None
    }
}

/// Shortest text form of a number; integral values have no fraction.
///
/// Magnitudes of `1e21` and above or below `1e-6` use exponent notation
/// with an explicit exponent sign (`1e+21`, `1.5e-7`).
pub fn format_number(n: f64) -> String {
    match as_exact_integer(n) {
        Some(i) => i.to_string(),
        None if n.is_nan() => "NaN".to_string(),
        None if n.is_infinite() => {
            if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
        }
        None if n.abs() >= 1e21 || n.abs() < 1e-6 => {
            let text = format!("{n:e}");
            match text.split_once('e') {
                Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
                _ => text,
            }
        }
        None => n.to_string(),
    }
}

/// Leading decimal integer of `s` (leading whitespace and a sign allowed).
///
/// `"12abc"` parses as `12`; `"abc"` has no leading integer.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value: i64 = rest[..digits].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Leading decimal number of `s` (sign, fraction and exponent allowed).
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_digits = bytes[end..].iter().take_while(|b| b.is_ascii_digit()).count();
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = bytes[end + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = bytes[exp_end..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().ok()
}
