//! ---
//! dab_section: "04-daemon"
//! dab_subsection: "module"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Binary entrypoint and simulated device for the DAB bridge daemon."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! Simulated streaming device.
//!
//! Backs the daemon when no real device integration is wired in and
//! gives end-to-end runs something to launch, key-press, and sample
//! telemetry from. All state is in memory.

use std::collections::BTreeMap;

use dab_core::{DabError, DabResult, Device, OperationKind};
use dab_json::JsonValue;

const KEY_CODES: &[&str] = &[
    "KEY_POWER",
    "KEY_HOME",
    "KEY_BACK",
    "KEY_UP",
    "KEY_DOWN",
    "KEY_LEFT",
    "KEY_RIGHT",
    "KEY_ENTER",
    "KEY_VOLUME_UP",
    "KEY_VOLUME_DOWN",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppState {
    Stopped,
    Foreground,
    Background,
}

impl AppState {
    fn label(self) -> &'static str {
        match self {
            AppState::Stopped => "STOPPED",
            AppState::Foreground => "FOREGROUND",
            AppState::Background => "BACKGROUND",
        }
    }
}

/// In-memory stand-in for a streaming stick.
pub struct SimulatedDevice {
    apps: BTreeMap<String, AppState>,
    key_presses: u64,
    ticks: u64,
}

impl SimulatedDevice {
    /// Device with the stock app lineup, everything stopped.
    #[must_use]
    pub fn new() -> Self {
        let apps = ["home", "netflix", "prime-video", "youtube"]
            .into_iter()
            .map(|app| (app.to_owned(), AppState::Stopped))
            .collect();
        Self {
            apps,
            key_presses: 0,
            ticks: 0,
        }
    }

    fn app_entry(&mut self, app_id: &str) -> DabResult<&mut AppState> {
        self.apps
            .get_mut(app_id)
            .ok_or_else(|| DabError::bad_request(format!("unknown appId \"{app_id}\"")))
    }

    fn background_all(&mut self) {
        for state in self.apps.values_mut() {
            if *state == AppState::Foreground {
                *state = AppState::Background;
            }
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for SimulatedDevice {
    fn implemented(&self) -> &[OperationKind] {
        &[
            OperationKind::ApplicationsList,
            OperationKind::ApplicationsLaunch,
            OperationKind::ApplicationsGetState,
            OperationKind::ApplicationsExit,
            OperationKind::DeviceInfo,
            OperationKind::InputKeyList,
            OperationKind::InputKeyPress,
            OperationKind::HealthCheckGet,
            OperationKind::DeviceTelemetry,
            OperationKind::AppTelemetry,
        ]
    }

    fn is_compatible(_probe: &str) -> bool {
        // the simulator can stand in for any endpoint
        true
    }

    fn app_list(&mut self) -> DabResult<JsonValue> {
        let applications = self
            .apps
            .keys()
            .map(|app_id| JsonValue::from([("appId", JsonValue::from(app_id.clone()))]))
            .collect::<JsonValue>();
        Ok(JsonValue::from([("applications", applications)]))
    }

    fn app_launch(&mut self, app_id: String, _parameters: JsonValue) -> DabResult<JsonValue> {
        self.app_entry(&app_id)?;
        self.background_all();
        *self.app_entry(&app_id)? = AppState::Foreground;
        Ok(JsonValue::object())
    }

    fn app_get_state(&mut self, app_id: String) -> DabResult<JsonValue> {
        let state = *self.app_entry(&app_id)?;
        Ok(JsonValue::from([("state", JsonValue::from(state.label()))]))
    }

    fn app_exit(&mut self, app_id: String, background: bool) -> DabResult<JsonValue> {
        let entry = self.app_entry(&app_id)?;
        *entry = if background {
            AppState::Background
        } else {
            AppState::Stopped
        };
        Ok(JsonValue::from([(
            "state",
            JsonValue::from(entry.label()),
        )]))
    }

    fn device_info(&mut self) -> DabResult<JsonValue> {
        Ok(JsonValue::from([
            ("chipset", JsonValue::from("sim-x1")),
            ("firmwareVersion", JsonValue::from("1.4.2")),
            ("manufacturer", JsonValue::from("Acme")),
            ("model", JsonValue::from("SimStick")),
            ("serialNumber", JsonValue::from("SIM-0001")),
        ]))
    }

    fn input_key_list(&mut self) -> DabResult<JsonValue> {
        let key_codes = KEY_CODES
            .iter()
            .map(|code| JsonValue::from(*code))
            .collect::<JsonValue>();
        Ok(JsonValue::from([("keyCodes", key_codes)]))
    }

    fn input_key_press(&mut self, key_code: String) -> DabResult<JsonValue> {
        if !KEY_CODES.contains(&key_code.as_str()) {
            return Err(DabError::bad_request(format!(
                "unknown keyCode \"{key_code}\""
            )));
        }
        self.key_presses += 1;
        Ok(JsonValue::object())
    }

    fn health_check_get(&mut self) -> DabResult<JsonValue> {
        Ok(JsonValue::from([("healthy", JsonValue::from(true))]))
    }

    fn device_telemetry(&mut self) -> DabResult<JsonValue> {
        self.ticks += 1;
        // a gentle sawtooth keeps successive samples distinguishable
        let cpu = 15 + (self.ticks % 10) as i64 * 3;
        let memory = 420 + (self.ticks % 7) as i64 * 12;
        Ok(JsonValue::from([
            ("cpuUsagePercent", JsonValue::from(cpu)),
            ("keyPresses", JsonValue::from(self.key_presses as i64)),
            ("memoryUsageMb", JsonValue::from(memory)),
        ]))
    }

    fn app_telemetry(&mut self, app_id: String) -> DabResult<JsonValue> {
        let state = *self.app_entry(&app_id)?;
        self.ticks += 1;
        let memory = if state == AppState::Stopped {
            0
        } else {
            96 + (self.ticks % 5) as i64 * 8
        };
        Ok(JsonValue::from([
            ("appId", JsonValue::from(app_id)),
            ("memoryUsageMb", JsonValue::from(memory)),
            ("state", JsonValue::from(state.label())),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_moves_previous_foreground_to_background() {
        let mut device = SimulatedDevice::new();
        device.app_launch("netflix".into(), JsonValue::object()).unwrap();
        device.app_launch("youtube".into(), JsonValue::object()).unwrap();
        let netflix = device.app_get_state("netflix".into()).unwrap();
        assert_eq!(
            netflix.get("state").unwrap().as_str().unwrap(),
            "BACKGROUND"
        );
        let youtube = device.app_get_state("youtube".into()).unwrap();
        assert_eq!(
            youtube.get("state").unwrap().as_str().unwrap(),
            "FOREGROUND"
        );
    }

    #[test]
    fn unknown_app_is_rejected() {
        let mut device = SimulatedDevice::new();
        let err = device
            .app_launch("missing".into(), JsonValue::object())
            .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn exit_honours_background_flag() {
        let mut device = SimulatedDevice::new();
        device.app_launch("netflix".into(), JsonValue::object()).unwrap();
        let response = device.app_exit("netflix".into(), false).unwrap();
        assert_eq!(response.get("state").unwrap().as_str().unwrap(), "STOPPED");
    }

    #[test]
    fn key_press_requires_known_code() {
        let mut device = SimulatedDevice::new();
        device.input_key_press("KEY_HOME".into()).unwrap();
        assert!(device.input_key_press("KEY_BOGUS".into()).is_err());
        assert_eq!(device.key_presses, 1);
    }

    #[test]
    fn telemetry_counts_key_presses() {
        let mut device = SimulatedDevice::new();
        device.input_key_press("KEY_ENTER".into()).unwrap();
        device.input_key_press("KEY_ENTER".into()).unwrap();
        let sample = device.device_telemetry().unwrap();
        assert_eq!(
            sample.get("keyPresses").unwrap().as_i64().unwrap(),
            2
        );
    }

    #[test]
    fn stopped_app_reports_zero_memory() {
        let mut device = SimulatedDevice::new();
        let sample = device.app_telemetry("netflix".into()).unwrap();
        assert_eq!(sample.get("memoryUsageMb").unwrap().as_i64().unwrap(), 0);
    }
}
