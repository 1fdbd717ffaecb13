//! Lenient JSON value coercion shared by the analytics pipeline.
//!
//! Upstream webhook payloads mix strings and numbers freely for identities,
//! durations, and prices, so every reader in this crate goes through these
//! helpers instead of calling `Value::as_*` directly.

use serde_json::{Map, Number, Value};

pub(crate) fn optional_string_value(value: Option<&Value>) -> Option<String> {
    let value = value?;
    match value {
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(raw) => Some(raw.to_string()),
        _ => None,
    }
}

pub(crate) fn optional_string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    optional_string_value(object.get(key))
}

pub(crate) fn optional_f64_value(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    match value {
        Value::Number(raw) => raw.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub(crate) fn optional_f64_field(object: &Map<String, Value>, key: &str) -> Option<f64> {
    optional_f64_value(object.get(key))
}

/// Renders `raw` as a JSON number, preferring the integer representation when
/// the value carries no fractional part. Non-finite inputs become `0`.
pub(crate) fn number_value(raw: f64) -> Value {
    if !raw.is_finite() {
        return Value::Number(Number::from(0));
    }
    if raw.fract() == 0.0 && raw >= i64::MIN as f64 && raw <= i64::MAX as f64 {
        return Value::Number(Number::from(raw as i64));
    }
    Number::from_f64(raw)
        .map(Value::Number)
        .unwrap_or_else(|| Value::Number(Number::from(0)))
}

pub(crate) fn round_2dp(raw: f64) -> f64 {
    (raw * 100.0).round() / 100.0
}
