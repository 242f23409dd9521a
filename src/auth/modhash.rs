//! Modhash extraction
//!
//! Reddit hands out a modhash alongside the session cookie. Login responses
//! (`api_type=json`) carry it under `json.data.modhash`, listing-style
//! responses under `data.modhash`, and some responses only in the
//! `X-Modhash` header. An empty string means "no modhash".

use crate::pipeline::ResponseEnvelope;
use serde_json::Value;

/// Response header that may carry the modhash
pub const MODHASH_HEADER: &str = "x-modhash";

const MODHASH_PATHS: [&str; 2] = ["$.json.data.modhash", "$.data.modhash"];

/// Extract the modhash from a response body or headers
pub fn extract_modhash(response: &ResponseEnvelope) -> Option<String> {
    response
        .json::<Value>()
        .ok()
        .and_then(|body| extract_modhash_from_value(&body))
        .or_else(|| {
            response
                .header_str(MODHASH_HEADER)
                .filter(|m| !m.is_empty())
                .map(String::from)
        })
}

/// Extract the modhash from an already-parsed JSON body
pub fn extract_modhash_from_value(body: &Value) -> Option<String> {
    MODHASH_PATHS
        .iter()
        .find_map(|path| extract_jsonpath(body, path))
        .filter(|m| !m.is_empty())
}

/// Extract a value from JSON using a simple JSONPath expression
/// Supports basic paths like "$.data.token" or "data.token"
pub fn extract_jsonpath(value: &Value, path: &str) -> Option<String> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
