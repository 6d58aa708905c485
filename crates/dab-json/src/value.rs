//! ---
//! dab_section: "02-wire-json-codec"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Wire JSON value model and codec."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use crate::JsonError;

/// Object storage. The ordered map is part of the wire contract: object
/// iteration and serialization follow lexicographic key byte order.
pub type JsonObject = BTreeMap<String, JsonValue>;

/// Array storage.
pub type JsonArray = Vec<JsonValue>;

/// A single node in the wire JSON tree.
///
/// A freshly constructed value is [`JsonValue::Null`]. Mutable lookup
/// auto-vivifies: key lookup turns the value into an object, index lookup
/// into an array. Read accessors are strict; the `*_mut` accessors carry
/// the protocol's intentional numeric coercions.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
    /// Absent / unset. Serializes as `null`.
    #[default]
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// IEEE-754 binary64.
    Double(f64),
    /// Byte string (escaping rules are the serializer's concern).
    String(String),
    /// Ordered sequence of values.
    Array(JsonArray),
    /// Key-to-value mapping in lexicographic key order.
    Object(JsonObject),
}

impl JsonValue {
    /// Empty object constructor.
    #[must_use]
    pub fn object() -> Self {
        JsonValue::Object(JsonObject::new())
    }

    /// Empty array constructor.
    #[must_use]
    pub fn array() -> Self {
        JsonValue::Array(JsonArray::new())
    }

    /// Variant name used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Integer(_) => "integer",
            JsonValue::Double(_) => "double",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    /// True for [`JsonValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// True for [`JsonValue::Bool`].
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self, JsonValue::Bool(_))
    }

    /// True for [`JsonValue::Integer`].
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, JsonValue::Integer(_))
    }

    /// True for [`JsonValue::Double`].
    #[must_use]
    pub fn is_double(&self) -> bool {
        matches!(self, JsonValue::Double(_))
    }

    /// True for [`JsonValue::String`].
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, JsonValue::String(_))
    }

    /// True for [`JsonValue::Array`].
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, JsonValue::Array(_))
    }

    /// True for [`JsonValue::Object`].
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, JsonValue::Object(_))
    }

    /// Presence test on objects. A key whose stored value is `null`
    /// counts as absent; non-objects never contain anything.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        match self {
            JsonValue::Object(map) => map.get(key).is_some_and(|v| !v.is_null()),
            _ => false,
        }
    }

    /// Key lookup on objects.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Index lookup on arrays.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&JsonValue> {
        match self {
            JsonValue::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Mutable key lookup. Any variant that is not already an object is
    /// replaced by an empty object first; a missing key is created as
    /// `null`.
    pub fn entry(&mut self, key: &str) -> &mut JsonValue {
        if !self.is_object() {
            *self = JsonValue::object();
        }
        let JsonValue::Object(map) = self else {
            unreachable!("entry() promotes to object")
        };
        map.entry(key.to_owned()).or_default()
    }

    /// Mutable index lookup. Any variant that is not already an array is
    /// replaced by an empty array first; the array grows with `null`
    /// entries up to `index`.
    pub fn at(&mut self, index: usize) -> &mut JsonValue {
        if !self.is_array() {
            *self = JsonValue::array();
        }
        let JsonValue::Array(items) = self else {
            unreachable!("at() promotes to array")
        };
        if index >= items.len() {
            items.resize_with(index + 1, JsonValue::default);
        }
        &mut items[index]
    }

    /// Append to an array, promoting `null` to an empty array. Appending
    /// to any other scalar or an object is an error.
    pub fn push(&mut self, value: impl Into<JsonValue>) -> Result<(), JsonError> {
        match self {
            JsonValue::Null => {
                *self = JsonValue::Array(vec![value.into()]);
                Ok(())
            }
            JsonValue::Array(items) => {
                items.push(value.into());
                Ok(())
            }
            other => Err(JsonError::mismatch("array", other.kind())),
        }
    }

    /// Entry count: object or array length, `null` counts zero, anything
    /// else has no meaningful size.
    pub fn len(&self) -> Result<usize, JsonError> {
        match self {
            JsonValue::Object(map) => Ok(map.len()),
            JsonValue::Array(items) => Ok(items.len()),
            JsonValue::Null => Ok(0),
            other => Err(JsonError::mismatch("object or array", other.kind())),
        }
    }

    /// True when [`JsonValue::len`] reports zero.
    pub fn is_empty(&self) -> Result<bool, JsonError> {
        Ok(self.len()? == 0)
    }

    /// Reset to `null`.
    pub fn clear(&mut self) {
        *self = JsonValue::Null;
    }

    /// Strict string read.
    pub fn as_str(&self) -> Result<&str, JsonError> {
        match self {
            JsonValue::String(s) => Ok(s),
            other => Err(JsonError::mismatch("string", other.kind())),
        }
    }

    /// Strict integer read.
    pub fn as_i64(&self) -> Result<i64, JsonError> {
        match self {
            JsonValue::Integer(n) => Ok(*n),
            other => Err(JsonError::mismatch("integer", other.kind())),
        }
    }

    /// Strict double read.
    pub fn as_f64(&self) -> Result<f64, JsonError> {
        match self {
            JsonValue::Double(d) => Ok(*d),
            other => Err(JsonError::mismatch("double", other.kind())),
        }
    }

    /// Strict boolean read.
    pub fn as_bool(&self) -> Result<bool, JsonError> {
        match self {
            JsonValue::Bool(b) => Ok(*b),
            other => Err(JsonError::mismatch("boolean", other.kind())),
        }
    }

    /// Strict object read.
    pub fn as_object(&self) -> Result<&JsonObject, JsonError> {
        match self {
            JsonValue::Object(map) => Ok(map),
            other => Err(JsonError::mismatch("object", other.kind())),
        }
    }

    /// Strict array read.
    pub fn as_array(&self) -> Result<&[JsonValue], JsonError> {
        match self {
            JsonValue::Array(items) => Ok(items),
            other => Err(JsonError::mismatch("array", other.kind())),
        }
    }

    /// Write-through boolean accessor. An integer coerces to its
    /// nonzero-ness; every other variant resets to `false`.
    pub fn bool_mut(&mut self) -> &mut bool {
        match self {
            JsonValue::Bool(_) => {}
            JsonValue::Integer(n) => *self = JsonValue::Bool(*n != 0),
            _ => *self = JsonValue::Bool(false),
        }
        let JsonValue::Bool(b) = self else {
            unreachable!("bool_mut() coerces to boolean")
        };
        b
    }

    /// Write-through integer accessor. A double truncates; every other
    /// variant resets to `0`.
    pub fn i64_mut(&mut self) -> &mut i64 {
        match self {
            JsonValue::Integer(_) => {}
            JsonValue::Double(d) => *self = JsonValue::Integer(*d as i64),
            _ => *self = JsonValue::Integer(0),
        }
        let JsonValue::Integer(n) = self else {
            unreachable!("i64_mut() coerces to integer")
        };
        n
    }

    /// Write-through double accessor. An integer widens value-preserving;
    /// every other variant resets to `0.0`.
    pub fn f64_mut(&mut self) -> &mut f64 {
        match self {
            JsonValue::Double(_) => {}
            JsonValue::Integer(n) => *self = JsonValue::Double(*n as f64),
            _ => *self = JsonValue::Double(0.0),
        }
        let JsonValue::Double(d) = self else {
            unreachable!("f64_mut() coerces to double")
        };
        d
    }

    /// Write-through string accessor. Every non-string variant resets to
    /// the empty string.
    pub fn string_mut(&mut self) -> &mut String {
        if !self.is_string() {
            *self = JsonValue::String(String::new());
        }
        let JsonValue::String(s) = self else {
            unreachable!("string_mut() coerces to string")
        };
        s
    }
}

impl From<bool> for JsonValue {
    fn from(v: bool) -> Self {
        JsonValue::Bool(v)
    }
}

impl From<i64> for JsonValue {
    fn from(v: i64) -> Self {
        JsonValue::Integer(v)
    }
}

impl From<i32> for JsonValue {
    fn from(v: i32) -> Self {
        JsonValue::Integer(i64::from(v))
    }
}

impl From<u32> for JsonValue {
    fn from(v: u32) -> Self {
        JsonValue::Integer(i64::from(v))
    }
}

impl From<f64> for JsonValue {
    fn from(v: f64) -> Self {
        JsonValue::Double(v)
    }
}

impl From<&str> for JsonValue {
    fn from(v: &str) -> Self {
        JsonValue::String(v.to_owned())
    }
}

impl From<String> for JsonValue {
    fn from(v: String) -> Self {
        JsonValue::String(v)
    }
}

impl From<JsonArray> for JsonValue {
    fn from(v: JsonArray) -> Self {
        JsonValue::Array(v)
    }
}

impl From<JsonObject> for JsonValue {
    fn from(v: JsonObject) -> Self {
        JsonValue::Object(v)
    }
}

impl FromIterator<JsonValue> for JsonValue {
    fn from_iter<I: IntoIterator<Item = JsonValue>>(iter: I) -> Self {
        JsonValue::Array(iter.into_iter().collect())
    }
}

impl FromIterator<(String, JsonValue)> for JsonValue {
    fn from_iter<I: IntoIterator<Item = (String, JsonValue)>>(iter: I) -> Self {
        JsonValue::Object(iter.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<JsonValue>, const N: usize> From<[(K, V); N]> for JsonValue {
    fn from(pairs: [(K, V); N]) -> Self {
        JsonValue::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_value_is_null() {
        assert!(JsonValue::default().is_null());
    }

    #[test]
    fn entry_auto_vivifies_object() {
        let mut value = JsonValue::Null;
        *value.entry("status") = JsonValue::from(200);
        assert!(value.is_object());
        assert_eq!(value.get("status").unwrap().as_i64().unwrap(), 200);
    }

    #[test]
    fn entry_replaces_scalar_with_object() {
        let mut value = JsonValue::from("scalar");
        *value.entry("a") = JsonValue::from(1);
        assert!(value.is_object());
        assert!(value.get("a").is_some());
    }

    #[test]
    fn at_grows_array_with_nulls() {
        let mut value = JsonValue::Null;
        *value.at(2) = JsonValue::from("third");
        assert_eq!(value.len().unwrap(), 3);
        assert!(value.get_index(0).unwrap().is_null());
        assert_eq!(value.get_index(2).unwrap().as_str().unwrap(), "third");
    }

    #[test]
    fn has_treats_stored_null_as_absent() {
        let mut value = JsonValue::object();
        *value.entry("present") = JsonValue::from(1);
        value.entry("absent");
        assert!(value.has("present"));
        assert!(!value.has("absent"));
        assert!(!value.has("missing"));
    }

    #[test]
    fn push_promotes_null_and_rejects_scalars() {
        let mut value = JsonValue::Null;
        value.push(JsonValue::from(1)).unwrap();
        value.push(JsonValue::from(2)).unwrap();
        assert_eq!(value.len().unwrap(), 2);

        let mut scalar = JsonValue::from(7i64);
        assert!(scalar.push(JsonValue::Null).is_err());
    }

    #[test]
    fn len_of_null_is_zero_and_scalars_err() {
        assert_eq!(JsonValue::Null.len().unwrap(), 0);
        assert!(JsonValue::from(true).len().is_err());
    }

    #[test]
    fn strict_readers_reject_mismatch() {
        let value = JsonValue::from(42i64);
        assert_eq!(value.as_i64().unwrap(), 42);
        assert!(value.as_str().is_err());
        assert!(value.as_bool().is_err());
        assert!(value.as_f64().is_err());
    }

    #[test]
    fn bool_mut_coerces_integer_nonzero() {
        let mut value = JsonValue::from(3i64);
        assert!(*value.bool_mut());
        let mut zero = JsonValue::from(0i64);
        assert!(!*zero.bool_mut());
        let mut string = JsonValue::from("x");
        assert!(!*string.bool_mut());
    }

    #[test]
    fn i64_mut_truncates_double() {
        let mut value = JsonValue::from(3.9);
        assert_eq!(*value.i64_mut(), 3);
        assert!(value.is_integer());
    }

    #[test]
    fn f64_mut_widens_integer() {
        let mut value = JsonValue::from(5i64);
        assert_eq!(*value.f64_mut(), 5.0);
        assert!(value.is_double());
    }

    #[test]
    fn write_through_converts_variant() {
        let mut value = JsonValue::from("text");
        *value.i64_mut() = 11;
        assert_eq!(value.as_i64().unwrap(), 11);
        *value.string_mut() = "again".to_owned();
        assert_eq!(value.as_str().unwrap(), "again");
    }

    #[test]
    fn object_iteration_is_lexicographic() {
        let value = JsonValue::from([("zeta", 1i64), ("alpha", 2), ("mid", 3)]);
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["alpha", "mid", "zeta"]);
    }
}
