//! ---
//! dab_section: "01-core-protocol"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Request routing, device adapters, and telemetry scheduling."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! Device adapter base.
//!
//! A [`DeviceAdapter`] owns the full operation registry for one device:
//! every protocol operation is registered at construction with its
//! parameter schema and a handler closing over the shared device state.
//! Operations the concrete [`Device`] does not list in
//! [`Device::implemented`] keep their default 501 stubs and stay out of
//! `operations/list` and the subscription topic set.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dab_json::JsonValue;
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::error::{DabError, DabResult};
use crate::publish::{PublishFn, Publisher};
use crate::telemetry::{SchedulerHandle, TelemetryScheduler};

/// Version string of the implemented protocol.
pub const PROTOCOL_VERSION: &str = "2.0";

/// The one topic without a `deviceId` segment, owned by the bridge.
pub const DISCOVERY_TOPIC: &str = "dab/discovery";

/// Overridable protocol operations a device can declare support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// `applications/list`
    ApplicationsList,
    /// `applications/launch`
    ApplicationsLaunch,
    /// `applications/launch-with-content`
    ApplicationsLaunchWithContent,
    /// `applications/get-state`
    ApplicationsGetState,
    /// `applications/exit`
    ApplicationsExit,
    /// `device/info`
    DeviceInfo,
    /// `system/restart`
    SystemRestart,
    /// `system/settings/list`
    SystemSettingsList,
    /// `system/settings/get`
    SystemSettingsGet,
    /// `system/settings/set`
    SystemSettingsSet,
    /// `input/key/list`
    InputKeyList,
    /// `input/key-press`
    InputKeyPress,
    /// `input/long-key-press`
    InputLongKeyPress,
    /// `output/image`
    OutputImage,
    /// Device-scope telemetry producer; gates `device-telemetry/{start,stop}`.
    DeviceTelemetry,
    /// App-scope telemetry producer; gates `app-telemetry/{start,stop}`.
    AppTelemetry,
    /// `health-check/get`
    HealthCheckGet,
    /// `voice/list`
    VoiceList,
    /// `voice/set`
    VoiceSet,
    /// `voice/send-audio`
    VoiceSendAudio,
    /// `voice/send-text`
    VoiceSendText,
}

/// Implementation surface of one physical device.
///
/// Every method defaults to a 501 "unsupported" stub. A concrete device
/// overrides the operations it can drive and lists them in
/// [`Device::implemented`]; that list is what `operations/list` reports
/// and what the transport subscribes to.
pub trait Device: Send + 'static {
    /// Operations this device genuinely implements.
    fn implemented(&self) -> &[OperationKind] {
        &[]
    }

    /// Catalogue probe: whether this device type can drive the endpoint
    /// described by `probe` (an ip address in bridge mode).
    fn is_compatible(probe: &str) -> bool
    where
        Self: Sized,
    {
        let _ = probe;
        false
    }

    /// `applications/list`
    fn app_list(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `applications/launch`
    fn app_launch(&mut self, _app_id: String, _parameters: JsonValue) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `applications/launch-with-content`
    fn app_launch_with_content(
        &mut self,
        _app_id: String,
        _content_id: String,
        _parameters: JsonValue,
    ) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `applications/get-state`
    fn app_get_state(&mut self, _app_id: String) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `applications/exit`
    fn app_exit(&mut self, _app_id: String, _background: bool) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `device/info`
    fn device_info(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `system/restart`
    fn system_restart(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `system/settings/list`
    fn system_settings_list(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `system/settings/get`
    fn system_settings_get(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `system/settings/set`; receives the full request envelope.
    fn system_settings_set(&mut self, _envelope: JsonValue) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `input/key/list`
    fn input_key_list(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `input/key-press`
    fn input_key_press(&mut self, _key_code: String) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `input/long-key-press`
    fn input_long_key_press(
        &mut self,
        _key_code: String,
        _duration_ms: i64,
    ) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `output/image`
    fn output_image(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// Device-scope telemetry producer, invoked once per tick.
    fn device_telemetry(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// App-scope telemetry producer, invoked once per tick.
    fn app_telemetry(&mut self, _app_id: String) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `health-check/get`
    fn health_check_get(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `voice/list`
    fn voice_list(&mut self) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `voice/set`
    fn voice_set(&mut self, _voice_system: JsonValue) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `voice/send-audio`
    fn voice_send_audio(
        &mut self,
        _file_location: String,
        _voice_system: String,
    ) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }

    /// `voice/send-text`
    fn voice_send_text(
        &mut self,
        _request_text: String,
        _voice_system: String,
    ) -> DabResult<JsonValue> {
        Err(DabError::unsupported())
    }
}

struct RegisteredOperation {
    dispatcher: Dispatcher,
    implemented: bool,
}

struct RegistryBuilder {
    prefix: String,
    implemented_kinds: Vec<OperationKind>,
    registry: BTreeMap<String, RegisteredOperation>,
}

impl RegistryBuilder {
    /// Overridable operation; the implemented flag follows the device's
    /// declaration for `kind`.
    fn op(&mut self, suffix: &str, kind: OperationKind, dispatcher: Dispatcher) {
        let implemented = self.implemented_kinds.contains(&kind);
        let topic = format!("{}{}", self.prefix, suffix);
        self.registry.insert(
            topic,
            RegisteredOperation {
                dispatcher,
                implemented,
            },
        );
    }

    /// Meta operation, always reported.
    fn meta(&mut self, suffix: &str, dispatcher: Dispatcher) {
        let topic = format!("{}{}", self.prefix, suffix);
        self.registry.insert(
            topic,
            RegisteredOperation {
                dispatcher,
                implemented: true,
            },
        );
    }
}

fn lock<T>(device: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    device.lock().expect("device state poisoned")
}

fn interval_from_millis(duration_ms: i64) -> DabResult<Duration> {
    u64::try_from(duration_ms)
        .map(Duration::from_millis)
        .map_err(|_| DabError::bad_request("invalid duration"))
}

/// One device instance: operation registry, telemetry worker, publish
/// plumbing. The registry is immutable after construction; device state
/// sits behind a mutex shared by request handlers and telemetry
/// producers. Dropping the adapter joins the telemetry worker first, so
/// no handler can run against dead state.
pub struct DeviceAdapter {
    device_id: String,
    registry: BTreeMap<String, RegisteredOperation>,
    publisher: Publisher,
    scheduler: TelemetryScheduler,
}

impl std::fmt::Debug for DeviceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAdapter")
            .field("device_id", &self.device_id)
            .field("registry_len", &self.registry.len())
            .finish()
    }
}

impl DeviceAdapter {
    /// Build the adapter for `device` and start its telemetry worker.
    pub fn new<T: Device>(
        device_id: impl Into<String>,
        ip_address: impl Into<String>,
        device: T,
    ) -> Self {
        let device_id = device_id.into();
        let ip_address = ip_address.into();
        let device = Arc::new(Mutex::new(device));
        let implemented_kinds = lock(&device).implemented().to_vec();
        let publisher = Publisher::new();
        let scheduler = TelemetryScheduler::spawn(publisher.clone());
        let telemetry = scheduler.handle();

        let mut b = RegistryBuilder {
            prefix: format!("dab/{device_id}/"),
            implemented_kinds,
            registry: BTreeMap::new(),
        };

        b.op(
            "applications/list",
            OperationKind::ApplicationsList,
            Dispatcher::new(&[], &[], {
                let device = Arc::clone(&device);
                move |_| lock(&device).app_list()
            }),
        );
        b.op(
            "applications/launch",
            OperationKind::ApplicationsLaunch,
            Dispatcher::new(&["appId"], &["parameters"], {
                let device = Arc::clone(&device);
                move |args| lock(&device).app_launch(args.string(0)?, args.value(1))
            }),
        );
        b.op(
            "applications/launch-with-content",
            OperationKind::ApplicationsLaunchWithContent,
            Dispatcher::new(&["appId", "contentId"], &["parameters"], {
                let device = Arc::clone(&device);
                move |args| {
                    lock(&device).app_launch_with_content(
                        args.string(0)?,
                        args.string(1)?,
                        args.value(2),
                    )
                }
            }),
        );
        b.op(
            "applications/get-state",
            OperationKind::ApplicationsGetState,
            Dispatcher::new(&["appId"], &[], {
                let device = Arc::clone(&device);
                move |args| lock(&device).app_get_state(args.string(0)?)
            }),
        );
        b.op(
            "applications/exit",
            OperationKind::ApplicationsExit,
            Dispatcher::new(&["appId"], &["background"], {
                let device = Arc::clone(&device);
                move |args| lock(&device).app_exit(args.string(0)?, args.bool(1)?)
            }),
        );
        b.op(
            "device/info",
            OperationKind::DeviceInfo,
            Dispatcher::new(&[], &[], {
                let device = Arc::clone(&device);
                move |_| lock(&device).device_info()
            }),
        );
        b.op(
            "system/restart",
            OperationKind::SystemRestart,
            Dispatcher::new(&[], &[], {
                let device = Arc::clone(&device);
                move |_| lock(&device).system_restart()
            }),
        );
        b.op(
            "system/settings/list",
            OperationKind::SystemSettingsList,
            Dispatcher::new(&[], &[], {
                let device = Arc::clone(&device);
                move |_| lock(&device).system_settings_list()
            }),
        );
        b.op(
            "system/settings/get",
            OperationKind::SystemSettingsGet,
            Dispatcher::new(&[], &[], {
                let device = Arc::clone(&device);
                move |_| lock(&device).system_settings_get()
            }),
        );
        b.op(
            "system/settings/set",
            OperationKind::SystemSettingsSet,
            Dispatcher::new(&["*"], &[], {
                let device = Arc::clone(&device);
                move |args| lock(&device).system_settings_set(args.value(0))
            }),
        );
        b.op(
            "input/key/list",
            OperationKind::InputKeyList,
            Dispatcher::new(&[], &[], {
                let device = Arc::clone(&device);
                move |_| lock(&device).input_key_list()
            }),
        );
        b.op(
            "input/key-press",
            OperationKind::InputKeyPress,
            Dispatcher::new(&["keyCode"], &[], {
                let device = Arc::clone(&device);
                move |args| lock(&device).input_key_press(args.string(0)?)
            }),
        );
        b.op(
            "input/long-key-press",
            OperationKind::InputLongKeyPress,
            Dispatcher::new(&["keyCode", "durationMs"], &[], {
                let device = Arc::clone(&device);
                move |args| lock(&device).input_long_key_press(args.string(0)?, args.i64(1)?)
            }),
        );
        b.op(
            "output/image",
            OperationKind::OutputImage,
            Dispatcher::new(&[], &[], {
                let device = Arc::clone(&device);
                move |_| lock(&device).output_image()
            }),
        );
        b.op(
            "device-telemetry/start",
            OperationKind::DeviceTelemetry,
            Dispatcher::new(&["duration"], &[], {
                let device = Arc::clone(&device);
                let telemetry = telemetry.clone();
                let topic = format!("dab/{device_id}/device-telemetry/metrics");
                move |args| {
                    let duration_ms = args.i64(0)?;
                    let interval = interval_from_millis(duration_ms)?;
                    let producer_device = Arc::clone(&device);
                    telemetry.add(
                        "",
                        interval,
                        topic.clone(),
                        Box::new(move || lock(&producer_device).device_telemetry()),
                    );
                    Ok(JsonValue::from([("duration", JsonValue::from(duration_ms))]))
                }
            }),
        );
        b.op(
            "device-telemetry/stop",
            OperationKind::DeviceTelemetry,
            Dispatcher::new(&[], &[], {
                let telemetry = telemetry.clone();
                move |_| {
                    telemetry.remove("");
                    Ok(JsonValue::object())
                }
            }),
        );
        b.op(
            "app-telemetry/start",
            OperationKind::AppTelemetry,
            Dispatcher::new(&["appId", "duration"], &[], {
                let device = Arc::clone(&device);
                let telemetry = telemetry.clone();
                let device_id = device_id.clone();
                move |args| {
                    let app_id = args.string(0)?;
                    let duration_ms = args.i64(1)?;
                    let interval = interval_from_millis(duration_ms)?;
                    let topic = format!("dab/{device_id}/app-telemetry/metrics/{app_id}");
                    let producer_device = Arc::clone(&device);
                    let producer_app = app_id.clone();
                    telemetry.add(
                        &app_id,
                        interval,
                        topic,
                        Box::new(move || lock(&producer_device).app_telemetry(producer_app.clone())),
                    );
                    Ok(JsonValue::from([("duration", JsonValue::from(duration_ms))]))
                }
            }),
        );
        b.op(
            "app-telemetry/stop",
            OperationKind::AppTelemetry,
            Dispatcher::new(&["appId"], &[], {
                let telemetry = telemetry.clone();
                move |args| {
                    telemetry.remove(&args.string(0)?);
                    Ok(JsonValue::object())
                }
            }),
        );
        b.op(
            "health-check/get",
            OperationKind::HealthCheckGet,
            Dispatcher::new(&[], &[], {
                let device = Arc::clone(&device);
                move |_| lock(&device).health_check_get()
            }),
        );
        b.op(
            "voice/list",
            OperationKind::VoiceList,
            Dispatcher::new(&[], &[], {
                let device = Arc::clone(&device);
                move |_| lock(&device).voice_list()
            }),
        );
        b.op(
            "voice/set",
            OperationKind::VoiceSet,
            Dispatcher::new(&["voiceSystem"], &[], {
                let device = Arc::clone(&device);
                move |args| lock(&device).voice_set(args.value(0))
            }),
        );
        b.op(
            "voice/send-audio",
            OperationKind::VoiceSendAudio,
            Dispatcher::new(&["fileLocation"], &["voiceSystem"], {
                let device = Arc::clone(&device);
                move |args| lock(&device).voice_send_audio(args.string(0)?, args.string(1)?)
            }),
        );
        b.op(
            "voice/send-text",
            OperationKind::VoiceSendText,
            Dispatcher::new(&["requestText"], &["voiceSystem"], {
                let device = Arc::clone(&device);
                move |args| lock(&device).voice_send_text(args.string(0)?, args.string(1)?)
            }),
        );
        b.meta(
            "version",
            Dispatcher::new(&[], &[], |_| {
                Ok(JsonValue::from([(
                    "versions",
                    JsonValue::from_iter([JsonValue::from(PROTOCOL_VERSION)]),
                )]))
            }),
        );

        // the operation list is static once the registry is sealed, so it
        // is computed here and the operations/list handler closes over it
        let mut operations: Vec<String> = b
            .registry
            .iter()
            .filter(|(_, op)| op.implemented)
            .filter_map(|(topic, _)| topic.strip_prefix(&b.prefix).map(str::to_owned))
            .collect();
        operations.push("operations/list".to_owned());
        operations.sort();
        b.meta(
            "operations/list",
            Dispatcher::new(&[], &[], move |_| {
                Ok(JsonValue::from([(
                    "operations",
                    operations
                        .iter()
                        .cloned()
                        .map(JsonValue::from)
                        .collect::<JsonValue>(),
                )]))
            }),
        );

        // dab/discovery is dispatchable on every adapter for the bridge
        // fan-out but never advertised by the adapter itself
        let discovery = Dispatcher::new(&[], &[], {
            let device_id = device_id.clone();
            let ip_address = ip_address.clone();
            move |_| {
                Ok(JsonValue::from([
                    ("deviceId", JsonValue::from(device_id.clone())),
                    ("ip", JsonValue::from(ip_address.clone())),
                ]))
            }
        });
        b.registry.insert(
            DISCOVERY_TOPIC.to_owned(),
            RegisteredOperation {
                dispatcher: discovery,
                implemented: false,
            },
        );

        Self {
            device_id,
            registry: b.registry,
            publisher,
            scheduler,
        }
    }

    /// The device identifier this adapter answers for.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Route one request envelope. Always produces a response: handler
    /// output merged with a default `status: 200`, or the `{status,
    /// error}` shape for failures.
    #[must_use]
    pub fn dispatch(&self, envelope: &JsonValue) -> JsonValue {
        let mut response = match self.try_dispatch(envelope) {
            Ok(value) => value,
            Err(err) => err.response(),
        };
        if !response.has("status") {
            *response.entry("status") = JsonValue::from(200);
        }
        response
    }

    fn try_dispatch(&self, envelope: &JsonValue) -> DabResult<JsonValue> {
        let topic = match envelope.get("topic") {
            Some(topic) => topic.as_str()?,
            None => return Err(DabError::bad_request("unable to parse request")),
        };
        match self.registry.get(topic) {
            Some(operation) => {
                debug!(device = %self.device_id, topic, "dispatching operation");
                operation.dispatcher.invoke(envelope)
            }
            // an unknown suffix on a known device answers as an empty
            // success, matching protocol behavior
            None => Ok(JsonValue::object()),
        }
    }

    /// Topics to subscribe for: every operation whose implemented flag is
    /// set. `dab/discovery` is appended by the bridge, not here.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.registry
            .iter()
            .filter(|(_, op)| op.implemented)
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    /// Install the outbound publish callback.
    pub fn set_publish_callback(&self, callback: PublishFn) {
        self.publisher.set(callback);
    }

    /// Push a notification through the publish callback.
    pub fn publish(&self, message: &JsonValue) {
        self.publisher.publish(message);
    }

    /// Handle onto this adapter's telemetry queue.
    #[must_use]
    pub fn telemetry(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedDevice;

    impl Device for ScriptedDevice {
        fn implemented(&self) -> &[OperationKind] {
            &[
                OperationKind::ApplicationsLaunch,
                OperationKind::DeviceTelemetry,
            ]
        }

        fn app_launch(&mut self, app_id: String, _parameters: JsonValue) -> DabResult<JsonValue> {
            Ok(JsonValue::from([(
                "started",
                JsonValue::from(app_id == "netflix"),
            )]))
        }

        fn device_telemetry(&mut self) -> DabResult<JsonValue> {
            Ok(JsonValue::from([("cpuUsage", JsonValue::from(12i64))]))
        }
    }

    fn adapter() -> DeviceAdapter {
        DeviceAdapter::new("device-1", "10.0.0.9", ScriptedDevice)
    }

    fn request(topic: &str, payload: JsonValue) -> JsonValue {
        JsonValue::from([("topic", JsonValue::from(topic)), ("payload", payload)])
    }

    #[test]
    fn version_reports_protocol() {
        let response = adapter().dispatch(&request("dab/device-1/version", JsonValue::object()));
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 200);
        let versions = response.get("versions").unwrap();
        assert_eq!(versions.get_index(0).unwrap().as_str().unwrap(), "2.0");
    }

    #[test]
    fn operations_list_reports_only_implemented() {
        let response =
            adapter().dispatch(&request("dab/device-1/operations/list", JsonValue::object()));
        let operations: Vec<String> = response
            .get("operations")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_owned())
            .collect();
        assert!(operations.contains(&"operations/list".to_owned()));
        assert!(operations.contains(&"version".to_owned()));
        assert!(operations.contains(&"applications/launch".to_owned()));
        assert!(operations.contains(&"device-telemetry/start".to_owned()));
        assert!(operations.contains(&"device-telemetry/stop".to_owned()));
        assert!(!operations.contains(&"applications/exit".to_owned()));
        assert!(!operations.contains(&"app-telemetry/start".to_owned()));
        let mut sorted = operations.clone();
        sorted.sort();
        assert_eq!(operations, sorted);
    }

    #[test]
    fn topics_follow_the_implemented_flag() {
        let topics = adapter().topics();
        assert!(topics.contains(&"dab/device-1/applications/launch".to_owned()));
        assert!(topics.contains(&"dab/device-1/version".to_owned()));
        assert!(!topics.contains(&"dab/device-1/voice/list".to_owned()));
        assert!(!topics.contains(&DISCOVERY_TOPIC.to_owned()));
    }

    #[test]
    fn launch_happy_path_merges_status() {
        let response = adapter().dispatch(&request(
            "dab/device-1/applications/launch",
            JsonValue::from([("appId", "netflix")]),
        ));
        assert!(response.get("started").unwrap().as_bool().unwrap());
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 200);
    }

    #[test]
    fn launch_without_app_id_is_400() {
        let response = adapter().dispatch(&request(
            "dab/device-1/applications/launch",
            JsonValue::object(),
        ));
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 400);
        assert_eq!(
            response.get("error").unwrap().as_str().unwrap(),
            "missing parameter \"appId\""
        );
    }

    #[test]
    fn unimplemented_operation_is_501() {
        let response = adapter().dispatch(&request(
            "dab/device-1/applications/exit",
            JsonValue::from([("appId", "netflix")]),
        ));
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 501);
        assert_eq!(response.get("error").unwrap().as_str().unwrap(), "unsupported");
    }

    #[test]
    fn unknown_suffix_answers_empty_success() {
        let response = adapter().dispatch(&request("dab/device-1/nonsense", JsonValue::object()));
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 200);
        assert_eq!(response.len().unwrap(), 1);
    }

    #[test]
    fn discovery_reports_ip_and_device_id() {
        let response = adapter().dispatch(&request(DISCOVERY_TOPIC, JsonValue::object()));
        assert_eq!(response.get("ip").unwrap().as_str().unwrap(), "10.0.0.9");
        assert_eq!(
            response.get("deviceId").unwrap().as_str().unwrap(),
            "device-1"
        );
    }

    #[test]
    fn telemetry_start_echoes_duration_and_schedules() {
        let adapter = adapter();
        let response = adapter.dispatch(&request(
            "dab/device-1/device-telemetry/start",
            JsonValue::from([("duration", JsonValue::from(250))]),
        ));
        assert_eq!(response.get("duration").unwrap().as_i64().unwrap(), 250);
        assert!(adapter.telemetry().contains(""));

        adapter.dispatch(&request(
            "dab/device-1/device-telemetry/stop",
            JsonValue::object(),
        ));
        assert!(!adapter.telemetry().contains(""));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let response = adapter().dispatch(&request(
            "dab/device-1/device-telemetry/start",
            JsonValue::from([("duration", JsonValue::from(-5))]),
        ));
        assert_eq!(response.get("status").unwrap().as_i64().unwrap(), 400);
    }

    #[test]
    fn settings_set_receives_the_whole_envelope() {
        struct SettingsDevice {
            seen_topic: bool,
        }
        impl Device for SettingsDevice {
            fn implemented(&self) -> &[OperationKind] {
                &[OperationKind::SystemSettingsSet]
            }
            fn system_settings_set(&mut self, envelope: JsonValue) -> DabResult<JsonValue> {
                self.seen_topic = envelope.has("topic");
                Ok(JsonValue::from([(
                    "sawTopic",
                    JsonValue::from(self.seen_topic),
                )]))
            }
        }
        let adapter =
            DeviceAdapter::new("device-1", "10.0.0.9", SettingsDevice { seen_topic: false });
        let response = adapter.dispatch(&request(
            "dab/device-1/system/settings/set",
            JsonValue::from([("pictureMode", "vivid")]),
        ));
        assert!(response.get("sawTopic").unwrap().as_bool().unwrap());
    }
}
