//! Firestore typed-value codec
//!
//! Firestore's REST API wraps every value in a single-key object naming its
//! type (`{"stringValue": "x"}`, `{"mapValue": {"fields": {...}}}`, ...).
//! These helpers convert between that form and plain JSON. Timestamps decode
//! to their RFC 3339 string; the content layer normalizes them.

use crate::store::Fields;
use serde_json::{Map, Value, json};

/// Encode a plain JSON value as a Firestore value
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode a document field map
pub fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode(v)))
            .collect::<Map<_, _>>(),
    )
}

/// Decode a Firestore value into plain JSON
pub fn decode(value: &Value) -> Result<Value, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected typed value object, got {}", value))?;
    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| "empty typed value".to_string())?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("booleanValue is not a bool: {}", inner)),
        // int64 travels as a string
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| format!("integerValue '{}': {}", s, e)),
            Value::Number(n) => Ok(Value::Number(n.clone())),
            other => Err(format!("integerValue has unexpected type: {}", other)),
        },
        "doubleValue" => inner
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| format!("doubleValue is not a number: {}", inner)),
        "timestampValue" | "stringValue" | "bytesValue" | "referenceValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| format!("{} is not a string: {}", kind, inner)),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values.iter().map(decode).collect::<Result<_, _>>()?,
                _ => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields).map(Value::Object),
            _ => Ok(Value::Object(Map::new())),
        },
        other => Err(format!("unsupported value type '{}'", other)),
    }
}

/// Decode a Firestore `fields` object
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Fields, String> {
    fields
        .iter()
        .map(|(k, v)| decode(v).map(|decoded| (k.clone(), decoded)))
        .collect()
}
