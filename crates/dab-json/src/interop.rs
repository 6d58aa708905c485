//! ---
//! dab_section: "02-wire-json-codec"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Wire JSON value model and codec."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! Conversions between the wire value model and `serde_json`.
//!
//! Configuration and other serde-typed data cross into the wire model
//! through these impls. Numbers wider than `i64` fall back to doubles;
//! a non-finite double maps to `null` on the way out because
//! `serde_json` has no representation for it.

use crate::JsonValue;

impl From<&serde_json::Value> for JsonValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => JsonValue::Integer(i),
                None => JsonValue::Double(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => JsonValue::String(s.clone()),
            serde_json::Value::Array(items) => items.iter().map(JsonValue::from).collect(),
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), JsonValue::from(v)))
                .collect(),
        }
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        JsonValue::from(&value)
    }
}

impl From<&JsonValue> for serde_json::Value {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => serde_json::Value::Null,
            JsonValue::Bool(b) => serde_json::Value::Bool(*b),
            JsonValue::Integer(n) => serde_json::Value::from(*n),
            JsonValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            JsonValue::String(s) => serde_json::Value::String(s.clone()),
            JsonValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            JsonValue::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::JsonValue;

    #[test]
    fn serde_value_converts_structurally() {
        let value = JsonValue::from(json!({
            "deviceId": "device-1",
            "count": 3,
            "ratio": 0.5,
            "tags": ["a", "b"],
        }));
        assert_eq!(value.get("deviceId").unwrap().as_str().unwrap(), "device-1");
        assert_eq!(value.get("count").unwrap().as_i64().unwrap(), 3);
        assert_eq!(value.get("ratio").unwrap().as_f64().unwrap(), 0.5);
        assert_eq!(value.get("tags").unwrap().len().unwrap(), 2);
    }

    #[test]
    fn round_trips_through_serde() {
        let original = JsonValue::from([
            ("flag", JsonValue::from(true)),
            ("nested", JsonValue::from([("n", JsonValue::from(-4i64))])),
        ]);
        let serde_value = serde_json::Value::from(&original);
        assert_eq!(JsonValue::from(serde_value), original);
    }

    #[test]
    fn u64_beyond_i64_becomes_double() {
        let value = JsonValue::from(json!(u64::MAX));
        assert!(value.is_double());
    }
}
