//! ---
//! dab_section: "02-wire-json-codec"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Wire JSON value model and codec."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
use std::fmt::Write as _;

use crate::JsonValue;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

impl JsonValue {
    /// Serialize to the compact wire form: keys quoted, no whitespace.
    #[must_use]
    pub fn to_wire_string(&self) -> String {
        let mut buf = String::new();
        self.serialize(&mut buf, true);
        buf
    }

    /// Serialize into `buf`. `quote_keys` disables object key quoting;
    /// the unquoted mode is for internal rendering only, the wire form
    /// always quotes.
    pub fn serialize(&self, buf: &mut String, quote_keys: bool) {
        match self {
            JsonValue::Null => buf.push_str("null"),
            JsonValue::Bool(true) => buf.push_str("true"),
            JsonValue::Bool(false) => buf.push_str("false"),
            JsonValue::Integer(n) => {
                let _ = write!(buf, "{n}");
            }
            JsonValue::Double(d) => write_double(*d, buf),
            JsonValue::String(s) => write_string(s, buf),
            JsonValue::Array(items) => {
                buf.push('[');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        buf.push(',');
                    }
                    item.serialize(buf, quote_keys);
                }
                buf.push(']');
            }
            JsonValue::Object(map) => {
                buf.push('{');
                for (index, (key, value)) in map.iter().enumerate() {
                    if index > 0 {
                        buf.push(',');
                    }
                    if quote_keys {
                        buf.push('"');
                    }
                    // keys are protocol identifiers and are emitted raw
                    buf.push_str(key);
                    if quote_keys {
                        buf.push('"');
                    }
                    buf.push(':');
                    value.serialize(buf, quote_keys);
                }
                buf.push('}');
            }
        }
    }
}

fn write_string(s: &str, buf: &mut String) {
    buf.push('"');
    for byte in s.bytes() {
        match byte {
            b'"' => buf.push_str("\\\""),
            b'\\' => buf.push_str("\\\\"),
            b'\r' => buf.push_str("\\r"),
            b'\n' => buf.push_str("\\n"),
            b'\t' => buf.push_str("\\t"),
            // control and non-ASCII bytes use the protocol's %XX form
            b if b < 0x20 || b > 0x7F => {
                buf.push('%');
                buf.push(HEX[usize::from(b >> 4)] as char);
                buf.push(HEX[usize::from(b & 0x0F)] as char);
            }
            b => buf.push(b as char),
        }
    }
    buf.push('"');
}

fn write_double(value: f64, buf: &mut String) {
    // an integral double keeps its fractional point so the wire form
    // reads back as a double
    if value.is_finite() && value.fract() == 0.0 {
        let _ = write!(buf, "{value:.1}");
    } else {
        let _ = write!(buf, "{value}");
    }
}

#[cfg(test)]
mod tests {
    use crate::{parse, JsonValue};

    #[test]
    fn compact_object_with_quoted_keys() {
        let value = JsonValue::from([("status", JsonValue::from(200))]);
        assert_eq!(value.to_wire_string(), r#"{"status":200}"#);
    }

    #[test]
    fn keys_emit_in_lexicographic_order() {
        let value = JsonValue::from([("b", 2i64), ("a", 1), ("c", 3)]);
        assert_eq!(value.to_wire_string(), r#"{"a":1,"b":2,"c":3}"#);
    }

    #[test]
    fn unquoted_key_mode() {
        let value = JsonValue::from([("topic", "dab/discovery")]);
        let mut buf = String::new();
        value.serialize(&mut buf, false);
        assert_eq!(buf, r#"{topic:"dab/discovery"}"#);
    }

    #[test]
    fn scalar_forms() {
        assert_eq!(JsonValue::Null.to_wire_string(), "null");
        assert_eq!(JsonValue::from(true).to_wire_string(), "true");
        assert_eq!(JsonValue::from(-12i64).to_wire_string(), "-12");
        assert_eq!(JsonValue::from(1.5).to_wire_string(), "1.5");
    }

    #[test]
    fn integral_double_keeps_its_point() {
        let text = JsonValue::from(3.0).to_wire_string();
        assert_eq!(text, "3.0");
        assert!(parse(&text).unwrap().is_double());
    }

    #[test]
    fn escapes_quotes_and_whitespace_controls() {
        let value = JsonValue::from("a\"b\\c\rd\ne\tf");
        assert_eq!(value.to_wire_string(), r#""a\"b\\c\rd\ne\tf""#);
    }

    #[test]
    fn percent_encodes_control_and_non_ascii_bytes() {
        let value = JsonValue::from("\u{1}");
        assert_eq!(value.to_wire_string(), r#""%01""#);
        // a two-byte UTF-8 sequence encodes byte-by-byte, uppercase hex
        let value = JsonValue::from("\u{00b0}");
        assert_eq!(value.to_wire_string(), r#""%C2%B0""#);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(JsonValue::object().to_wire_string(), "{}");
        assert_eq!(JsonValue::array().to_wire_string(), "[]");
    }

    #[test]
    fn nested_compact_output_has_no_whitespace() {
        let inner = JsonValue::from_iter([JsonValue::from(1i64), JsonValue::from(2i64)]);
        let value = JsonValue::from([("list", inner)]);
        assert_eq!(value.to_wire_string(), r#"{"list":[1,2]}"#);
    }
}
