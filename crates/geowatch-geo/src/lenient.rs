//! Lenient numeric coercion for third-party JSON.
//!
//! Upstream datasets mix numbers and numeric strings in the same field.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Number or numeric string as `f64`. Empty strings, nulls and anything
/// unparseable are `None`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Non-negative count, truncated; negatives and garbage are `0`.
pub fn coerce_count(value: Option<&Value>) -> u64 {
    value
        .and_then(coerce_f64)
        .filter(|v| *v > 0.0)
        .map(|v| v as u64)
        .unwrap_or(0)
}

/// String field, with numbers rendered; anything else is empty.
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// serde adapter for `Option<f64>` fields that may arrive as strings
pub fn f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_f64))
}
