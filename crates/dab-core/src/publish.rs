//! ---
//! dab_section: "01-core-protocol"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Request routing, device adapters, and telemetry scheduling."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
use std::sync::{Arc, Mutex};

use dab_json::JsonValue;
use tracing::warn;

/// Callback receiving every outbound `{"topic", "payload"}` message.
/// Must be safe to call from the telemetry worker concurrently with
/// request dispatch.
pub type PublishFn = Arc<dyn Fn(&JsonValue) + Send + Sync>;

/// Publish slot shared between an adapter, its telemetry scheduler, and
/// the bridge. Installed once by the transport layer before any traffic
/// flows; a message arriving earlier is logged and dropped.
#[derive(Clone, Default)]
pub struct Publisher {
    slot: Arc<Mutex<Option<PublishFn>>>,
}

impl Publisher {
    /// Empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the callback.
    pub fn set(&self, callback: PublishFn) {
        *self.slot.lock().expect("publish slot poisoned") = Some(callback);
    }

    /// Copy of the installed callback, if any.
    #[must_use]
    pub fn get(&self) -> Option<PublishFn> {
        self.slot.lock().expect("publish slot poisoned").clone()
    }

    /// Forward `message` to the installed callback.
    pub fn publish(&self, message: &JsonValue) {
        let callback = self.get();
        match callback {
            Some(callback) => callback(message),
            None => warn!("publish callback not installed, dropping message"),
        }
    }
}

/// Build the `{"topic": …, "payload": …}` publish envelope.
#[must_use]
pub fn publish_message(topic: &str, payload: JsonValue) -> JsonValue {
    JsonValue::from([
        ("payload", payload),
        ("topic", JsonValue::from(topic)),
    ])
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn publishes_through_installed_callback() {
        let publisher = Publisher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        publisher.set(Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        publisher.publish(&publish_message("dab/device-1/device-telemetry/metrics", JsonValue::object()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_callback_drops_message() {
        let publisher = Publisher::new();
        publisher.publish(&JsonValue::object());
    }

    #[test]
    fn publish_message_shape() {
        let message = publish_message("dab/d/app-telemetry/metrics/x", JsonValue::from([("m", 1i64)]));
        assert_eq!(
            message.get("topic").unwrap().as_str().unwrap(),
            "dab/d/app-telemetry/metrics/x"
        );
        assert_eq!(
            message.get("payload").unwrap().get("m").unwrap().as_i64().unwrap(),
            1
        );
    }
}
