use color_eyre::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{accessory::Accessory, protocols::mqtt::MqttClient, settings::Settings};

/// Accessory state as exchanged with the home-automation side.
///
/// Set messages carry only the fields to change; `id` and `name` are taken
/// from the topic and ignored in the payload.
#[derive(Builder, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[builder(setter(into, strip_option), default)]
#[serde(default)]
pub struct MqttDevice {
    pub id: String,
    pub name: String,
    pub power: Option<bool>,

    /// Brightness (0.0 - 1.0)
    pub brightness: Option<f32>,
}

impl MqttDevice {
    /// Current confirmed state of an accessory.
    pub fn from_accessory(accessory: &Accessory) -> Result<Self> {
        let device = MqttDeviceBuilder::default()
            .id(accessory.id.clone())
            .name(accessory.name.clone())
            .power(accessory.adapter.get_output())
            .brightness(brightness_to_mqtt(accessory.adapter.get_brightness()))
            .build()?;

        Ok(device)
    }

    /// Requested brightness as a device level (0 - 100).
    pub fn brightness_level(&self) -> Option<u8> {
        self.brightness.map(brightness_from_mqtt)
    }
}

pub fn brightness_to_mqtt(level: u8) -> f32 {
    f32::from(level.min(100)) / 100.0
}

pub fn brightness_from_mqtt(brightness: f32) -> u8 {
    if brightness.is_nan() {
        return 0;
    }

    (brightness.clamp(0.0, 1.0) * 100.0).round() as u8
}

pub async fn publish_mqtt_device(
    mqtt_client: &MqttClient,
    settings: &Settings,
    mqtt_device: &MqttDevice,
) -> Result<()> {
    let topic = settings.mqtt.light_topic.replace("{id}", &mqtt_device.id);

    let json = serde_json::to_string(&mqtt_device)?;

    mqtt_client
        .client
        .publish(topic, rumqttc::QoS::AtLeastOnce, true, json)
        .await?;

    Ok(())
}
