//! ---
//! dab_section: "01-core-protocol"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Request routing, device adapters, and telemetry scheduling."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! Multi-device bridge.
//!
//! One process serves many devices. The bridge owns every adapter
//! instance, routes inbound envelopes by the `deviceId` segment of the
//! topic, and handles the protocol-wide `dab/discovery` fan-out. New
//! instances are created by probing an ordered catalogue of adapter
//! types for one compatible with the target endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use dab_json::JsonValue;
use tracing::{debug, info};

use crate::adapter::{Device, DeviceAdapter, DISCOVERY_TOPIC};
use crate::error::{DabError, DabResult};
use crate::publish::{PublishFn, Publisher};

type BuildFn = Box<dyn Fn(&str, &str) -> DabResult<DeviceAdapter> + Send + Sync>;

/// One adapter type in the catalogue: a compatibility probe plus a
/// builder producing the adapter for a concrete device.
pub struct CatalogueEntry {
    name: &'static str,
    is_compatible: fn(&str) -> bool,
    build: BuildFn,
}

impl CatalogueEntry {
    /// Entry with an explicit probe and builder.
    pub fn new(
        name: &'static str,
        is_compatible: fn(&str) -> bool,
        build: impl Fn(&str, &str) -> DabResult<DeviceAdapter> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            is_compatible,
            build: Box::new(build),
        }
    }

    /// Entry for a [`Device`] type constructed from `(device_id, ip)`.
    /// The probe is the type's [`Device::is_compatible`].
    pub fn for_device<T, F>(name: &'static str, make: F) -> Self
    where
        T: Device,
        F: Fn(&str, &str) -> DabResult<T> + Send + Sync + 'static,
    {
        Self::new(name, T::is_compatible, move |device_id, ip_address| {
            Ok(DeviceAdapter::new(
                device_id,
                ip_address,
                make(device_id, ip_address)?,
            ))
        })
    }
}

/// Process-level multiplexer owning all adapter instances.
pub struct DeviceBridge {
    catalogue: Vec<CatalogueEntry>,
    instances: BTreeMap<String, DeviceAdapter>,
    publisher: Publisher,
}

impl DeviceBridge {
    /// Bridge over an ordered adapter catalogue.
    #[must_use]
    pub fn new(catalogue: Vec<CatalogueEntry>) -> Self {
        Self {
            catalogue,
            instances: BTreeMap::new(),
            publisher: Publisher::new(),
        }
    }

    /// Instantiate an adapter for `device_id`.
    ///
    /// Without an `ip_address` (on-device mode) the first catalogue type
    /// is used; otherwise the catalogue is probed in declaration order
    /// and the first compatible type wins. Device ids are unique for the
    /// lifetime of the bridge.
    pub fn make_device_instance(
        &mut self,
        device_id: &str,
        ip_address: Option<&str>,
    ) -> DabResult<&DeviceAdapter> {
        if self.instances.contains_key(device_id) {
            return Err(DabError::bad_request("deviceId already exists"));
        }
        let entry = match ip_address {
            None => self.catalogue.first(),
            Some(probe) => self
                .catalogue
                .iter()
                .find(|entry| (entry.is_compatible)(probe)),
        }
        .ok_or_else(|| DabError::bad_request("no compatible devices found"))?;

        info!(device = device_id, adapter = entry.name, "creating device instance");
        let adapter = (entry.build)(device_id, ip_address.unwrap_or(""))?;
        // a late-created instance still gets the already-installed callback
        if let Some(callback) = self.publisher.get() {
            adapter.set_publish_callback(callback);
        }
        self.instances.insert(device_id.to_owned(), adapter);
        Ok(self
            .instances
            .get(device_id)
            .expect("instance just inserted"))
    }

    /// Adapter registered for `device_id`, if any.
    #[must_use]
    pub fn adapter(&self, device_id: &str) -> Option<&DeviceAdapter> {
        self.instances.get(device_id)
    }

    /// Route one envelope. Every request yields exactly one response;
    /// bridge-level failures materialize as `{status, error}`.
    #[must_use]
    pub fn dispatch(&self, envelope: &JsonValue) -> JsonValue {
        match self.route(envelope) {
            Ok(response) => response,
            Err(err) => err.response(),
        }
    }

    fn route(&self, envelope: &JsonValue) -> DabResult<JsonValue> {
        if !envelope.has("topic") {
            return Err(DabError::bad_request("no topic found"));
        }
        let topic = envelope
            .get("topic")
            .unwrap_or(&JsonValue::Null)
            .as_str()?
            .to_owned();

        if topic == DISCOVERY_TOPIC {
            // every device answers discovery, but the reply channel only
            // carries one response; the rest go out via the publish
            // callback, in dictionary order of deviceId
            let mut adapters = self.instances.values();
            let first = adapters
                .next()
                .ok_or_else(|| DabError::bad_request("no devices registered"))?;
            let response = first.dispatch(envelope);
            for adapter in adapters {
                self.publisher.publish(&adapter.dispatch(envelope));
            }
            return Ok(response);
        }

        let Some(rest) = topic.strip_prefix("dab/") else {
            return Err(DabError::bad_request("topic is malformed"));
        };
        let Some(slash) = rest.find('/') else {
            return Err(DabError::bad_request("topic is malformed"));
        };
        let device_id = &rest[..slash];
        debug!(device = device_id, topic = %topic, "routing request");
        match self.instances.get(device_id) {
            Some(adapter) => Ok(adapter.dispatch(envelope)),
            None => Err(DabError::bad_request("deviceId does not exist")),
        }
    }

    /// Union of all adapter subscription topics plus `dab/discovery`.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .instances
            .values()
            .flat_map(DeviceAdapter::topics)
            .collect();
        topics.push(DISCOVERY_TOPIC.to_owned());
        topics
    }

    /// Install the publish callback on the bridge and every adapter.
    pub fn set_publish_callback(&self, callback: PublishFn) {
        for adapter in self.instances.values() {
            adapter.set_publish_callback(Arc::clone(&callback));
        }
        self.publisher.set(callback);
    }

    /// Registered device ids, in dictionary order.
    #[must_use]
    pub fn device_ids(&self) -> Vec<&str> {
        self.instances.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::OperationKind;

    struct PlainDevice;
    impl Device for PlainDevice {
        fn is_compatible(probe: &str) -> bool {
            probe.starts_with("10.")
        }
    }

    struct OtherDevice;
    impl Device for OtherDevice {
        fn implemented(&self) -> &[OperationKind] {
            &[OperationKind::ApplicationsList]
        }
        fn is_compatible(probe: &str) -> bool {
            probe.starts_with("192.")
        }
        fn app_list(&mut self) -> DabResult<JsonValue> {
            Ok(JsonValue::from([(
                "applications",
                JsonValue::array(),
            )]))
        }
    }

    fn catalogue() -> Vec<CatalogueEntry> {
        vec![
            CatalogueEntry::for_device("plain", |_, _| Ok(PlainDevice)),
            CatalogueEntry::for_device("other", |_, _| Ok(OtherDevice)),
        ]
    }

    fn request(topic: &str) -> JsonValue {
        JsonValue::from([("topic", JsonValue::from(topic))])
    }

    #[test]
    fn on_device_mode_instantiates_first_type() {
        let mut bridge = DeviceBridge::new(catalogue());
        bridge.make_device_instance("device-1", None).unwrap();
        // PlainDevice implements nothing: applications/list stays a stub
        let response = bridge.dispatch(&request("dab/device-1/applications/list"));
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 501);
    }

    #[test]
    fn probe_selects_first_compatible_type() {
        let mut bridge = DeviceBridge::new(catalogue());
        bridge
            .make_device_instance("device-2", Some("192.168.1.20"))
            .unwrap();
        let response = bridge.dispatch(&request("dab/device-2/applications/list"));
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 200);
        assert!(response.get("applications").unwrap().is_array());
    }

    #[test]
    fn incompatible_probe_is_400() {
        let mut bridge = DeviceBridge::new(catalogue());
        let err = bridge
            .make_device_instance("device-3", Some("172.16.0.1"))
            .unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "no compatible devices found");
    }

    #[test]
    fn duplicate_device_id_is_rejected() {
        let mut bridge = DeviceBridge::new(catalogue());
        bridge.make_device_instance("device-1", None).unwrap();
        let err = bridge.make_device_instance("device-1", None).unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn missing_topic_and_malformed_topics() {
        let bridge = DeviceBridge::new(catalogue());
        let response = bridge.dispatch(&JsonValue::object());
        assert_eq!(
            response.get("error").unwrap().as_str().unwrap(),
            "no topic found"
        );
        let response = bridge.dispatch(&request("dab/no-second-slash"));
        assert_eq!(
            response.get("error").unwrap().as_str().unwrap(),
            "topic is malformed"
        );
        let response = bridge.dispatch(&request("mqtt/other/topic"));
        assert_eq!(
            response.get("error").unwrap().as_str().unwrap(),
            "topic is malformed"
        );
    }

    #[test]
    fn unknown_device_is_400() {
        let bridge = DeviceBridge::new(catalogue());
        let response = bridge.dispatch(&request("dab/ghost/version"));
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 400);
        assert_eq!(
            response.get("error").unwrap().as_str().unwrap(),
            "deviceId does not exist"
        );
    }

    #[test]
    fn topics_union_includes_discovery() {
        let mut bridge = DeviceBridge::new(catalogue());
        bridge.make_device_instance("device-1", None).unwrap();
        bridge
            .make_device_instance("device-2", Some("192.168.1.20"))
            .unwrap();
        let topics = bridge.topics();
        assert!(topics.contains(&DISCOVERY_TOPIC.to_owned()));
        assert!(topics.contains(&"dab/device-1/version".to_owned()));
        assert!(topics.contains(&"dab/device-2/applications/list".to_owned()));
    }
}
