//! Request parameter canonicalization.
//!
//! Two parameter sets that differ only in key order must produce the same
//! cache key, so objects are written with their keys sorted at every depth.

use crate::endpoint::Endpoint;
use crate::error::{GatewayError, GatewayResult};
use serde_json::Value;

/// Compact JSON with object keys sorted recursively.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Cache key: endpoint id plus canonical params.
pub fn cache_key(endpoint: Endpoint, params: &Value) -> String {
    format!("{}?{}", endpoint.id(), canonical_json(params))
}

/// Flatten object params into query pairs, sorted by key.
///
/// Nulls are dropped, arrays are comma-joined, nested objects are sent as
/// compact JSON.
pub fn query_pairs(params: &Value) -> GatewayResult<Vec<(String, String)>> {
    let map = match params {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => {
            return Err(GatewayError::InvalidRequest(format!(
                "query params must be an object, got {other}"
            )))
        }
    };

    let mut pairs: Vec<(String, String)> = map
        .iter()
        .filter_map(|(key, value)| query_value(value).map(|v| (key.clone(), v)))
        .collect();
    pairs.sort();
    Ok(pairs)
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(query_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(canonical_json(value)),
        scalar => Some(scalar.to_string()),
    }
}
