//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Timestamps and references come back as strings; integers are carried as
//! decimal strings on the wire and surface as JSON integers.

use serde_json::{Map, Value, json};

use crate::store::Document;

/// Encode a plain JSON value as a Firestore `Value`.
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub fn encode_fields(fields: &Document) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode(v)))
        .collect()
}

/// Decode a Firestore `Value` back into plain JSON. Unknown shapes become null.
pub fn decode(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = object.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        },
        "doubleValue" => inner.clone(),
        "timestampValue" | "stringValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Document {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_post_fields() {
        let fields = json!({
            "title": "hello",
            "likes_count": 3,
            "tags": ["a", "b"],
            "author": null,
        });

        let encoded = encode_fields(fields.as_object().unwrap());

        assert_eq!(encoded["title"], json!({ "stringValue": "hello" }));
        assert_eq!(encoded["likes_count"], json!({ "integerValue": "3" }));
        assert_eq!(encoded["author"], json!({ "nullValue": null }));
        assert_eq!(
            encoded["tags"],
            json!({ "arrayValue": { "values": [{ "stringValue": "a" }, { "stringValue": "b" }] } })
        );
    }

    #[test]
    fn test_decode_server_document() {
        let fields = json!({
            "timestamp": { "timestampValue": "2024-05-01T10:00:00.123456Z" },
            "likes_count": { "integerValue": "12" },
            "ratio": { "doubleValue": 0.5 },
            "file_urls": { "arrayValue": {} },
            "meta": { "mapValue": { "fields": { "ok": { "booleanValue": true } } } },
        });

        let decoded = decode_fields(fields.as_object().unwrap());

        assert_eq!(decoded["timestamp"], "2024-05-01T10:00:00.123456Z");
        assert_eq!(decoded["likes_count"], 12);
        assert_eq!(decoded["ratio"], 0.5);
        assert_eq!(decoded["file_urls"], json!([]));
        assert_eq!(decoded["meta"], json!({ "ok": true }));
    }
}
