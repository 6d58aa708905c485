//! ---
//! dab_section: "01-core-protocol"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Request routing, device adapters, and telemetry scheduling."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
use dab_json::{JsonError, JsonValue};

/// Shared result type for protocol operations.
pub type DabResult<T> = std::result::Result<T, DabError>;

/// Protocol error delivered to the requester as `{status, error}`.
///
/// Statuses follow the HTTP-style taxonomy: 400 for malformed or
/// unroutable requests, 500 for internal failures, 501 for operations a
/// device does not implement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status {status}: {message}")]
pub struct DabError {
    /// HTTP-style status code.
    pub status: i64,
    /// Human-readable reason carried in the `error` field.
    pub message: String,
}

impl DabError {
    /// Error with an explicit status code.
    pub fn new(status: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 — the request cannot be routed or bound.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// 500 — internal failure while handling an otherwise valid request.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// 501 — the device does not implement this operation.
    #[must_use]
    pub fn unsupported() -> Self {
        Self::new(501, "unsupported")
    }

    /// 400 — a fixed parameter is absent from the envelope.
    #[must_use]
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(400, format!("missing parameter \"{name}\""))
    }

    /// Shape the error as a response envelope.
    #[must_use]
    pub fn response(&self) -> JsonValue {
        JsonValue::from([
            ("error", JsonValue::from(self.message.clone())),
            ("status", JsonValue::from(self.status)),
        ])
    }
}

impl From<JsonError> for DabError {
    fn from(err: JsonError) -> Self {
        // value-model errors surface uniformly, the detail goes to the log
        tracing::debug!(error = %err, "json error during dispatch");
        DabError::bad_request("unable to parse request")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_carries_status_and_error() {
        let response = DabError::bad_request("deviceId does not exist").response();
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 400);
        assert_eq!(
            response.get("error").unwrap().as_str().unwrap(),
            "deviceId does not exist"
        );
    }

    #[test]
    fn unsupported_is_501() {
        let err = DabError::unsupported();
        assert_eq!(err.status, 501);
        assert_eq!(err.message, "unsupported");
    }

    #[test]
    fn missing_parameter_quotes_the_name() {
        let err = DabError::missing_parameter("appId");
        assert_eq!(err.message, "missing parameter \"appId\"");
    }

    #[test]
    fn json_errors_map_to_uniform_400() {
        let err = DabError::from(dab_json::parse("{").unwrap_err());
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "unable to parse request");
    }
}
