use serde::Deserialize;
use serde_json::{Map, Value};

/// Result of `Shelly.GetDeviceInfo`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub id: String,
    pub model: String,
    pub name: Option<String>,
    pub gen: Option<u8>,
    pub ver: Option<String>,
    pub app: Option<String>,
}

/// Status of a `light:N` component. Notifications only carry the fields
/// that changed.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LightStatus {
    pub id: Option<u8>,
    pub output: Option<bool>,
    pub brightness: Option<u8>,
}

/// Frame published by the device on `<prefix>/events/rpc`.
#[derive(Deserialize, Debug, Clone)]
pub struct Notification {
    pub src: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Notification {
    /// Component statuses carried by this notification, if it is a status
    /// notification.
    pub fn status(&self) -> Option<&Map<String, Value>> {
        match self.method.as_str() {
            "NotifyStatus" | "NotifyFullStatus" => Some(&self.params),
            _ => None,
        }
    }
}

/// Splits a component key such as `light:2` into its type and index.
pub fn parse_component_key(key: &str) -> (&str, Option<u8>) {
    match key.split_once(':') {
        Some((kind, id)) => (kind, id.parse().ok()),
        None => (key, None),
    }
}
