//! Summary payload decoding
//!
//! Turns a raw `stats/summary` body into a [`NodeSummary`]. Decoding is
//! all-or-nothing: any error discards the whole payload.

use crate::error::DecodeError;
use crate::models::NodeSummary;
use serde_json::Value;

/// Decode a summary payload
pub fn decode_summary(payload: &[u8]) -> Result<NodeSummary, DecodeError> {
    let document: Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    match document.get("pods") {
        Some(Value::Array(_)) => {}
        Some(Value::Null) | None => return Err(DecodeError::MissingPods),
        Some(_) => {
            return Err(DecodeError::Schema("`pods` is not an array".to_string()));
        }
    }

    serde_json::from_value(document).map_err(|e| DecodeError::Schema(e.to_string()))
}
