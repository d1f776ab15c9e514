//! Lenient coercion of client-supplied values.
//!
//! Clients are browsers; fields may be missing, `null`, numeric strings or
//! garbage. Numbers never fail to decode: anything that is not a finite
//! number (or a string holding one) becomes zero.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a JSON value to a finite `f64`, zero on failure.
pub fn number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Coerce a JSON value to a string. Numbers are stringified, everything
/// else becomes empty.
pub fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Coerce a JSON value to a bool (`true`, non-zero numbers, `"true"`).
pub fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => s.eq_ignore_ascii_case("true") || s == "1",
        _ => false,
    }
}

/// Serde adapter: any value to a finite `f32`.
pub fn de_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = number(&value) as f32;
    Ok(if n.is_finite() { n } else { 0.0 })
}

/// Serde adapter: any value to a string.
pub fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| text(&v))
}

/// Serde adapter: any value to a bool.
pub fn de_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| flag(&v))
}

/// Serde adapter: non-negative integral values to `Some(u32)`, else `None`.
pub fn de_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    let n = number(&value);
    if n >= 0.0 && n <= u32::MAX as f64 && n.fract() == 0.0 && !matches!(value, Value::Bool(_)) {
        Ok(Some(n as u32))
    } else {
        Ok(None)
    }
}
