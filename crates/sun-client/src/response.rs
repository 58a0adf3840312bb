//! Node response unwrapping
//!
//! Nodes report failures inside a 200 response, either as an `Error` field
//! or as a hex encoded `result.message`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use sun_core::{decode_node_message, Result, SunError};

/// Surface an embedded node error, otherwise hand the response back
pub fn unwrap_response(response: Value) -> Result<Value> {
    let response = reject_error_field(response)?;

    if let Some(message) = response
        .get("result")
        .and_then(|r| r.get("message"))
        .and_then(Value::as_str)
    {
        let decoded = decode_node_message(message);
        tracing::warn!("node rejected request: {}", decoded);
        return Err(SunError::Remote(decoded));
    }

    Ok(response)
}

/// Surface only an `Error`/`error` field; coded `result` blocks pass through
pub(crate) fn reject_error_field(response: Value) -> Result<Value> {
    for key in ["Error", "error"] {
        if let Some(error) = response.get(key) {
            let message = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            tracing::warn!("node error: {}", message);
            return Err(SunError::Remote(message));
        }
    }
    Ok(response)
}

/// Unwrap and deserialize into `T`
pub fn unwrap_as<T: DeserializeOwned>(response: Value) -> Result<T> {
    let value = unwrap_response(response)?;
    serde_json::from_value(value).map_err(|e| SunError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sun_core::Transaction;

    #[test]
    fn test_error_field() {
        let err = unwrap_response(json!({"Error": "class org.tron.core.exception.ContractValidateException : balance is not sufficient"}))
            .unwrap_err();
        assert!(matches!(err, SunError::Remote(ref m) if m.contains("balance is not sufficient")));
    }

    #[test]
    fn test_hex_result_message_is_decoded() {
        let err = unwrap_response(json!({
            "result": {"code": "CONTRACT_VALIDATE_ERROR", "message": "636f6e7472616374206e6f7420666f756e64"}
        }))
        .unwrap_err();
        assert_eq!(err, SunError::Remote("contract not found".into()));
    }

    #[test]
    fn test_error_field_only_keeps_coded_results() {
        let coded = json!({"result": {"code": "PERMISSION_ERROR", "message": "6e6f"}});
        assert_eq!(reject_error_field(coded.clone()).unwrap(), coded);
        assert!(reject_error_field(json!({"error": "boom"})).is_err());
    }

    #[test]
    fn test_success_passes_through() {
        let value = json!({"result": {"result": true}, "txID": "ab"});
        assert_eq!(unwrap_response(value.clone()).unwrap(), value);
    }

    #[test]
    fn test_unwrap_as_reports_shape_errors() {
        let err = unwrap_as::<Transaction>(json!({"unexpected": true})).unwrap_err();
        assert_eq!(err.code(), 4002);
    }
}
