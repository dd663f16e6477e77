use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use uuid::Uuid;

use crate::device::constants::{make_device_config_service_uuid, CONNECT_DEADLINE, DEFAULT_SCAN_DURATION, OPERATION_DEADLINE};
use crate::device::types::DeviceSelector;

/// Settings of the tool itself. The clock's own configuration is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Address or name of the clock to use. Without it the first clock found is used.
    pub device: Option<String>,
    pub scan_duration_ms: u64,
    /// Only report peripherals advertising this service while scanning.
    pub scan_service: Option<Uuid>,
    pub operation_deadline_ms: u64,
    pub connect_deadline_ms: u64,
}

impl Config {
    pub fn scan_duration(&self) -> Duration {
        Duration::from_millis(self.scan_duration_ms)
    }

    pub fn operation_deadline(&self) -> Duration {
        Duration::from_millis(self.operation_deadline_ms)
    }

    pub fn connect_deadline(&self) -> Duration {
        Duration::from_millis(self.connect_deadline_ms)
    }

    pub fn selector(&self, device: Option<&str>) -> DeviceSelector {
        match device.or(self.device.as_deref()) {
            Some(name) => DeviceSelector::Named(name.to_string()),
            None => DeviceSelector::AdvertisesService(make_device_config_service_uuid()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: None,
            scan_duration_ms: DEFAULT_SCAN_DURATION,
            scan_service: None,
            operation_deadline_ms: OPERATION_DEADLINE,
            connect_deadline_ms: CONNECT_DEADLINE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{ "device": "Clockwise" }"#).unwrap();

        assert_eq!(config.device.as_deref(), Some("Clockwise"));
        assert_eq!(config.scan_duration_ms, DEFAULT_SCAN_DURATION);
        assert_eq!(config.operation_deadline(), Duration::from_millis(OPERATION_DEADLINE));
    }

    #[test]
    fn field_names_are_camel_case() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("\"scanDurationMs\""));
        assert!(json.contains("\"operationDeadlineMs\""));
    }

    #[test]
    fn selector_prefers_explicit_device() {
        let config = Config { device: Some("saved".to_string()), ..Config::default() };

        assert_eq!(config.selector(Some("given")), DeviceSelector::Named("given".to_string()));
        assert_eq!(config.selector(None), DeviceSelector::Named("saved".to_string()));
        assert_eq!(
            Config::default().selector(None),
            DeviceSelector::AdvertisesService(make_device_config_service_uuid())
        );
    }
}
