//! Typed payload decoding
//!
//! Each data source decodes raw JSON into its own payload type. A value that
//! fails to decode is never cached and never served.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::DecodeError;

/// A cacheable response body with an explicit decoder.
pub trait Payload: Clone + Serialize + Send + Sync + 'static {
    fn decode(value: &Value) -> Result<Self, DecodeError>;
}

/// Require `value` to be an object and return it.
pub fn decode_object(value: &Value) -> Result<&Map<String, Value>, DecodeError> {
    value.as_object().ok_or(DecodeError::NotAnObject)
}

/// Require `field` to be present and an array.
pub fn require_array<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Vec<Value>, DecodeError> {
    match object.get(field) {
        None => Err(DecodeError::MissingField(field)),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(DecodeError::WrongType {
            field,
            expected: "an array",
        }),
    }
}

/// Require `field` to be present and an object.
pub fn require_object<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Map<String, Value>, DecodeError> {
    match object.get(field) {
        None => Err(DecodeError::MissingField(field)),
        Some(Value::Object(inner)) => Ok(inner),
        Some(_) => Err(DecodeError::WrongType {
            field,
            expected: "an object",
        }),
    }
}

/// Deserialize after the structural checks have passed.
pub(crate) fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, DecodeError> {
    T::deserialize(value).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Blanket helper so sources can write `decode_as::<Self>(value, &["data"])`.
pub fn decode_as<T: DeserializeOwned>(
    value: &Value,
    required_arrays: &[&'static str],
) -> Result<T, DecodeError> {
    let object = decode_object(value)?;
    for field in required_arrays {
        require_array(object, field)?;
    }
    from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Anomalies {
        anomalies: Vec<Value>,
    }

    #[test]
    fn test_rejects_non_object() {
        let err = decode_as::<Anomalies>(&json!([1, 2]), &["anomalies"]).unwrap_err();
        assert_eq!(err, DecodeError::NotAnObject);
    }

    #[test]
    fn test_rejects_missing_and_mistyped_fields() {
        let missing = decode_as::<Anomalies>(&json!({"success": true}), &["anomalies"]).unwrap_err();
        assert_eq!(missing, DecodeError::MissingField("anomalies"));

        let wrong = decode_as::<Anomalies>(&json!({"anomalies": {}}), &["anomalies"]).unwrap_err();
        assert!(matches!(wrong, DecodeError::WrongType { field: "anomalies", .. }));
    }

    #[test]
    fn test_accepts_valid_payload() {
        let decoded = decode_as::<Anomalies>(&json!({"anomalies": [1]}), &["anomalies"]).unwrap();
        assert_eq!(decoded.anomalies.len(), 1);
    }
}
