//! ---
//! dab_section: "02-wire-json-codec"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Wire JSON value model and codec."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
use crate::{JsonError, JsonObject, JsonValue};

/// Parse one DAB wire JSON document.
///
/// The dialect accepts unquoted object keys (`[A-Za-z_][A-Za-z0-9_]*`),
/// restricts string escapes to `\" \\ \r \n \t` (any other `\X` becomes
/// the literal `X`; there is no `\uXXXX`), and lexes numbers as a run of
/// sign/digit/`.`/`e` characters where a `.` or `e` makes the value a
/// double. Only whitespace may follow the top-level value.
pub fn parse(input: &str) -> Result<JsonValue, JsonError> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_space();
    if parser.pos < parser.bytes.len() {
        return Err(JsonError::parse("invalid json", parser.pos));
    }
    Ok(value)
}

/// Byte-wise recursive descent state. Classification is per byte, so
/// multi-byte UTF-8 sequences pass through string bodies untouched and
/// are rejected everywhere else.
struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_space(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn value(&mut self) -> Result<JsonValue, JsonError> {
        self.skip_space();
        match self.peek() {
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(b'"') => Ok(JsonValue::String(self.string()?)),
            Some(c) if c.is_ascii_digit() || c == b'+' || c == b'-' => self.number(),
            _ => self.literal(),
        }
    }

    fn object(&mut self) -> Result<JsonValue, JsonError> {
        self.pos += 1;
        let mut map = JsonObject::new();
        let mut first = true;
        loop {
            self.skip_space();
            if self.eat(b'}') {
                break;
            }
            if !first {
                if !self.eat(b',') {
                    return Err(JsonError::parse("missing comma", self.pos));
                }
                self.skip_space();
                // a trailing comma before the closing brace is tolerated
                if self.eat(b'}') {
                    break;
                }
            }
            first = false;

            let key = self.key()?;
            self.skip_space();
            if !self.eat(b':') {
                return Err(JsonError::parse("missing name/value separator", self.pos));
            }
            let value = self.value()?;
            // a repeated key keeps the last value
            map.insert(key, value);
        }
        Ok(JsonValue::Object(map))
    }

    fn key(&mut self) -> Result<String, JsonError> {
        if self.eat(b'"') {
            // quoted keys are read verbatim up to the closing quote
            let start = self.pos;
            while let Some(c) = self.peek() {
                if c == b'"' {
                    let key = bytes_to_string(&self.bytes[start..self.pos], start)?;
                    self.pos += 1;
                    return Ok(key);
                }
                self.pos += 1;
            }
            return Err(JsonError::parse("missing \"", self.pos));
        }
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => self.pos += 1,
            _ => return Err(JsonError::parse("invalid json symbol value", self.pos)),
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        bytes_to_string(&self.bytes[start..self.pos], start)
    }

    fn array(&mut self) -> Result<JsonValue, JsonError> {
        self.pos += 1;
        let mut items = Vec::new();
        let mut first = true;
        loop {
            self.skip_space();
            if self.eat(b']') {
                break;
            }
            if !first && !self.eat(b',') {
                return Err(JsonError::parse("missing comma", self.pos));
            }
            first = false;
            items.push(self.value()?);
        }
        Ok(JsonValue::Array(items))
    }

    fn string(&mut self) -> Result<String, JsonError> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => return Err(JsonError::parse("missing \"", self.pos)),
                Some(b'"') => {
                    self.pos += 1;
                    return bytes_to_string(&out, self.pos);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        None => return Err(JsonError::parse("missing \"", self.pos)),
                        Some(b'r') => out.push(b'\r'),
                        Some(b'n') => out.push(b'\n'),
                        Some(b't') => out.push(b'\t'),
                        // `\"`, `\\` and any unrecognized `\X` yield the
                        // escaped byte itself
                        Some(other) => out.push(other),
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn number(&mut self) -> Result<JsonValue, JsonError> {
        let start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' | b'+' | b'-' => {}
                b'.' | b'e' => is_float = true,
                _ => break,
            }
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| JsonError::parse("invalid number", start))?;
        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| JsonError::parse("invalid number", start))?;
            Ok(JsonValue::Double(value))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| JsonError::parse("invalid number", start))?;
            Ok(JsonValue::Integer(value))
        }
    }

    fn literal(&mut self) -> Result<JsonValue, JsonError> {
        let rest = &self.bytes[self.pos.min(self.bytes.len())..];
        if rest.starts_with(b"true") {
            self.pos += 4;
            return Ok(JsonValue::Bool(true));
        }
        if rest.starts_with(b"false") {
            self.pos += 5;
            return Ok(JsonValue::Bool(false));
        }
        if rest.starts_with(b"null") {
            self.pos += 4;
            return Ok(JsonValue::Null);
        }
        Err(JsonError::parse("invalid json value", self.pos))
    }
}

fn bytes_to_string(bytes: &[u8], offset: usize) -> Result<String, JsonError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| JsonError::parse("invalid utf-8", offset))
}
