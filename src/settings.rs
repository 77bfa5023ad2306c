use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct ShellyDeviceSettings {
    /// Host or host:port of the device's local RPC endpoint
    pub addr: String,

    /// MQTT topic prefix configured on the device. Defaults to the device id
    /// reported by Shelly.GetDeviceInfo, which is also the firmware default.
    pub topic_prefix: Option<String>,

    /// Name used for the published accessories. Defaults to the device name
    /// reported by the device, or its id.
    pub name: Option<String>,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct ShellySettings {
    pub devices: Vec<ShellyDeviceSettings>,
    pub rpc_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    pub discovery_retry_seconds: u64,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct MqttSettings {
    pub id: Option<String>,
    pub host: String,
    pub port: u16,
    pub light_topic: String,
    pub light_topic_set: String,
}

impl MqttSettings {
    /// Client id to connect with. Brokers drop the older session when two
    /// clients share an id, so fall back to a random one.
    pub fn client_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => {
                let suffix: String = rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(8)
                    .map(char::from)
                    .collect();
                format!("shelly-mqtt-{}", suffix.to_lowercase())
            }
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Settings {
    pub shelly: ShellySettings,
    pub mqtt: MqttSettings,
}

pub fn read_settings() -> Result<Settings, config::ConfigError> {
    config::Config::builder()
        .set_default("shelly.rpc_timeout_seconds", 10)?
        .set_default("shelly.poll_interval_seconds", 30)?
        .set_default("shelly.discovery_retry_seconds", 30)?
        .add_source(config::File::with_name("Settings"))
        .add_source(config::Environment::with_prefix("SHELLY_MQTT").separator("__"))
        .build()?
        .try_deserialize::<Settings>()
}
