//! ---
//! dab_section: "01-core-protocol"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Request routing, device adapters, and telemetry scheduling."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use dab_json::JsonValue;

use crate::error::DabResult;

/// Messaging seam the bridge is wired against. The concrete MQTT client
/// lives outside the core; anything that can hand in request envelopes
/// and carry responses and telemetry back out fits here.
pub trait Transport: Send + Sync {
    /// Queue an outbound message (a response or a telemetry publish).
    fn send(&self, message: JsonValue) -> DabResult<()>;
    /// Next inbound request envelope, if one is waiting.
    fn recv(&self) -> Option<JsonValue>;
    /// Human-readable transport name for logging.
    fn name(&self) -> &'static str;
}

/// In-memory transport backed by mutex protected queues, for tests and
/// single-process integration.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    inbound: Arc<Mutex<VecDeque<JsonValue>>>,
    outbound: Arc<Mutex<VecDeque<JsonValue>>>,
}

impl InMemoryTransport {
    /// Empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Test side: enqueue an inbound request envelope.
    pub fn push_request(&self, envelope: JsonValue) {
        self.inbound
            .lock()
            .expect("inbound queue poisoned")
            .push_back(envelope);
    }

    /// Test side: drain the next outbound message.
    #[must_use]
    pub fn pop_outbound(&self) -> Option<JsonValue> {
        self.outbound
            .lock()
            .expect("outbound queue poisoned")
            .pop_front()
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, message: JsonValue) -> DabResult<()> {
        self.outbound
            .lock()
            .expect("outbound queue poisoned")
            .push_back(message);
        Ok(())
    }

    fn recv(&self) -> Option<JsonValue> {
        self.inbound
            .lock()
            .expect("inbound queue poisoned")
            .pop_front()
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
