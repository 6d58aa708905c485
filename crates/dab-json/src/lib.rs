//! ---
//! dab_section: "02-wire-json-codec"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Wire JSON value model and codec."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! JSON value model and codec for the DAB wire format.
//!
//! The dialect differs from RFC 8259 in a handful of deliberate ways:
//! object keys may be unquoted on input, the string escape set is
//! restricted, and the serializer percent-encodes control and non-ASCII
//! bytes. Both ends of the protocol depend on these quirks, so a stock
//! JSON library cannot be substituted on the wire path. For everything
//! that is not wire-facing (configuration, serde-typed data) the crate
//! provides conversions to and from `serde_json::Value`.

#![warn(missing_docs)]

mod interop;
mod parse;
mod serialize;
mod value;

pub use parse::parse;
pub use value::{JsonArray, JsonObject, JsonValue};

/// Shared result type for codec operations.
pub type Result<T> = std::result::Result<T, JsonError>;

/// Errors raised by the value model and codec.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JsonError {
    /// The input text is not valid DAB wire JSON.
    #[error("json parse error at byte {offset}: {reason}")]
    Parse {
        /// Short reason, e.g. `missing comma`.
        reason: String,
        /// Byte offset into the input where parsing stopped.
        offset: usize,
    },
    /// A typed accessor was applied to a mismatching variant.
    #[error("json type mismatch: expected {expected}, found {found}")]
    Type {
        /// The variant the accessor requires.
        expected: &'static str,
        /// The variant actually stored.
        found: &'static str,
    },
}

impl JsonError {
    pub(crate) fn parse(reason: impl Into<String>, offset: usize) -> Self {
        JsonError::Parse {
            reason: reason.into(),
            offset,
        }
    }

    pub(crate) fn mismatch(expected: &'static str, found: &'static str) -> Self {
        JsonError::Type { expected, found }
    }
}
