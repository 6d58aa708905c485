//! ---
//! dab_section: "01-core-protocol"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Request routing, device adapters, and telemetry scheduling."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! Parameter-binding dispatch.
//!
//! Every operation is described by a [`Dispatcher`]: the ordered fixed
//! and optional parameter names plus a handler closure. Binding resolves
//! each name first against `payload`, then against the envelope top
//! level; the sentinel name `*` binds the entire envelope. A missing
//! fixed parameter fails the request with status 400 before the handler
//! runs.

use dab_json::JsonValue;

use crate::error::{DabError, DabResult};

/// Handler invoked with the bound argument vector.
pub type HandlerFn = Box<dyn Fn(Arguments) -> DabResult<JsonValue> + Send + Sync>;

/// Immutable descriptor for one operation: parameter schema + handler.
pub struct Dispatcher {
    fixed: &'static [&'static str],
    optional: &'static [&'static str],
    handler: HandlerFn,
}

impl Dispatcher {
    /// Build a descriptor. Fixed parameters occupy the first argument
    /// positions in declaration order, optional parameters follow.
    pub fn new(
        fixed: &'static [&'static str],
        optional: &'static [&'static str],
        handler: impl Fn(Arguments) -> DabResult<JsonValue> + Send + Sync + 'static,
    ) -> Self {
        Self {
            fixed,
            optional,
            handler: Box::new(handler),
        }
    }

    /// Bind `envelope` against the parameter schema and invoke the
    /// handler. A handler producing `null` materializes as `{}`.
    pub fn invoke(&self, envelope: &JsonValue) -> DabResult<JsonValue> {
        let mut values = Vec::with_capacity(self.fixed.len() + self.optional.len());
        for name in self.fixed {
            values.push(Some(bind_fixed(envelope, name)?));
        }
        for name in self.optional {
            values.push(lookup(envelope, name).cloned());
        }
        let response = (self.handler)(Arguments { values })?;
        Ok(match response {
            JsonValue::Null => JsonValue::object(),
            other => other,
        })
    }
}

fn lookup<'a>(envelope: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    if let Some(payload) = envelope.get("payload") {
        if payload.has(name) {
            return payload.get(name);
        }
    }
    if envelope.has(name) {
        return envelope.get(name);
    }
    None
}

fn bind_fixed(envelope: &JsonValue, name: &str) -> DabResult<JsonValue> {
    if let Some(value) = lookup(envelope, name) {
        return Ok(value.clone());
    }
    if name == "*" {
        return Ok(envelope.clone());
    }
    Err(DabError::missing_parameter(name))
}

/// Positional arguments bound from a request envelope.
///
/// Absent optional parameters read back as the default of the accessor's
/// declared type: empty string, `0`, `false`, or an empty object.
/// A variant mismatch between the stored value and the accessor fails
/// with status 400.
pub struct Arguments {
    values: Vec<Option<JsonValue>>,
}

impl Arguments {
    fn slot(&self, index: usize) -> Option<&JsonValue> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// String argument at `index`.
    pub fn string(&self, index: usize) -> DabResult<String> {
        match self.slot(index) {
            None => Ok(String::new()),
            Some(value) => Ok(value.as_str()?.to_owned()),
        }
    }

    /// Integer argument at `index`.
    pub fn i64(&self, index: usize) -> DabResult<i64> {
        match self.slot(index) {
            None => Ok(0),
            Some(value) => Ok(value.as_i64()?),
        }
    }

    /// Boolean argument at `index`.
    pub fn bool(&self, index: usize) -> DabResult<bool> {
        match self.slot(index) {
            None => Ok(false),
            Some(value) => Ok(value.as_bool()?),
        }
    }

    /// Raw JSON argument at `index`, passed through verbatim. An absent
    /// optional binds an empty object.
    #[must_use]
    pub fn value(&self, index: usize) -> JsonValue {
        match self.slot(index) {
            None => JsonValue::object(),
            Some(value) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(payload: JsonValue) -> JsonValue {
        JsonValue::from([
            ("topic", JsonValue::from("dab/device-1/test")),
            ("payload", payload),
        ])
    }

    #[test]
    fn binds_fixed_from_payload_in_declaration_order() {
        let descriptor = Dispatcher::new(&["appId", "contentId"], &[], |args| {
            Ok(JsonValue::from([
                ("first", JsonValue::from(args.string(0)?)),
                ("second", JsonValue::from(args.string(1)?)),
            ]))
        });
        let request = envelope(JsonValue::from([
            ("contentId", "movie-9"),
            ("appId", "netflix"),
        ]));
        let response = descriptor.invoke(&request).unwrap();
        assert_eq!(response.get("first").unwrap().as_str().unwrap(), "netflix");
        assert_eq!(response.get("second").unwrap().as_str().unwrap(), "movie-9");
    }

    #[test]
    fn falls_back_to_envelope_top_level() {
        let descriptor =
            Dispatcher::new(&["appId"], &[], |args| Ok(JsonValue::from(args.string(0)?)));
        let request = JsonValue::from([("topic", "dab/device-1/test"), ("appId", "hulu")]);
        assert_eq!(
            descriptor.invoke(&request).unwrap().as_str().unwrap(),
            "hulu"
        );
    }

    #[test]
    fn payload_takes_precedence_over_top_level() {
        let descriptor =
            Dispatcher::new(&["appId"], &[], |args| Ok(JsonValue::from(args.string(0)?)));
        let mut request = envelope(JsonValue::from([("appId", "from-payload")]));
        *request.entry("appId") = JsonValue::from("from-top");
        assert_eq!(
            descriptor.invoke(&request).unwrap().as_str().unwrap(),
            "from-payload"
        );
    }

    #[test]
    fn missing_fixed_parameter_is_400() {
        let descriptor = Dispatcher::new(&["appId"], &[], |_| Ok(JsonValue::object()));
        let err = descriptor.invoke(&envelope(JsonValue::object())).unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "missing parameter \"appId\"");
    }

    #[test]
    fn star_binds_the_whole_envelope() {
        let descriptor = Dispatcher::new(&["*"], &[], |args| {
            let whole = args.value(0);
            Ok(JsonValue::from([(
                "sawTopic",
                JsonValue::from(whole.has("topic")),
            )]))
        });
        let response = descriptor.invoke(&envelope(JsonValue::object())).unwrap();
        assert!(response.get("sawTopic").unwrap().as_bool().unwrap());
    }

    #[test]
    fn absent_optionals_bind_declared_type_defaults() {
        let descriptor = Dispatcher::new(&[], &["name", "count", "flag", "extras"], |args| {
            assert_eq!(args.string(0)?, "");
            assert_eq!(args.i64(1)?, 0);
            assert!(!args.bool(2)?);
            assert_eq!(args.value(3), JsonValue::object());
            Ok(JsonValue::object())
        });
        descriptor.invoke(&envelope(JsonValue::object())).unwrap();
    }

    #[test]
    fn null_payload_value_counts_as_absent() {
        let descriptor = Dispatcher::new(&["appId"], &[], |_| Ok(JsonValue::object()));
        let mut payload = JsonValue::object();
        payload.entry("appId");
        let err = descriptor.invoke(&envelope(payload)).unwrap_err();
        assert_eq!(err.message, "missing parameter \"appId\"");
    }

    #[test]
    fn type_mismatch_surfaces_as_400() {
        let descriptor =
            Dispatcher::new(&["appId"], &[], |args| Ok(JsonValue::from(args.string(0)?)));
        let err = descriptor
            .invoke(&envelope(JsonValue::from([("appId", JsonValue::from(7))])))
            .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn null_handler_result_materializes_empty_object() {
        let descriptor = Dispatcher::new(&[], &[], |_| Ok(JsonValue::Null));
        let response = descriptor.invoke(&envelope(JsonValue::object())).unwrap();
        assert_eq!(response, JsonValue::object());
    }
}
