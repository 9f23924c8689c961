//! Conversion from Firestore typed values to plain JSON

use serde_json::{Map, Number, Value};

/// Convert a Firestore REST `Value` into plain JSON.
///
/// Vectors (`mapValue` tagged `__vector__`) become arrays of numbers and
/// integers, sent as strings by the REST API, become numbers.
#[must_use]
pub fn to_json(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = object.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" | "doubleValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(|i| Value::Number(Number::from(i)))
                .unwrap_or_else(|_| inner.clone()),
            other => other.clone(),
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(array_values(inner)),
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            if is_vector(&fields) {
                fields.get("value").map(to_json).unwrap_or(Value::Array(Vec::new()))
            } else {
                Value::Object(fields_to_json(&fields))
            }
        }
        _ => Value::Null,
    }
}

/// Convert a document's `fields` map
#[must_use]
pub fn fields_to_json(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), to_json(value)))
        .collect()
}

/// Encode a float vector the way `findNearest` expects its query vector
#[must_use]
pub fn vector_value(values: &[f64]) -> Value {
    let values: Vec<Value> = values
        .iter()
        .map(|v| serde_json::json!({ "doubleValue": v }))
        .collect();
    serde_json::json!({
        "mapValue": {
            "fields": {
                "__type__": { "stringValue": "__vector__" },
                "value": { "arrayValue": { "values": values } }
            }
        }
    })
}

fn array_values(inner: &Value) -> Vec<Value> {
    inner
        .get("values")
        .and_then(Value::as_array)
        .map(|values| values.iter().map(to_json).collect())
        .unwrap_or_default()
}

fn is_vector(fields: &Map<String, Value>) -> bool {
    fields
        .get("__type__")
        .and_then(|t| t.get("stringValue"))
        .and_then(Value::as_str)
        == Some("__vector__")
}
