use std::sync::Arc;

use color_eyre::Result;
use rumqttc::Publish;

use crate::{
    bridge::Bridge, mqtt::mqtt_device::MqttDevice, settings::Settings,
    shelly::status::Notification,
};

const EVENTS_SUFFIX: &str = "/events/rpc";
const ONLINE_SUFFIX: &str = "/online";

#[derive(Debug, PartialEq, Eq)]
pub enum Route<'a> {
    /// Command for an accessory, by accessory id
    Set(&'a str),
    /// RPC notification from a device, by topic prefix
    DeviceEvents(&'a str),
    /// Connectivity of a device, by topic prefix
    DeviceOnline(&'a str),
}

/// Extracts the `{id}` part of `topic` given a template such as
/// `home/lights/{id}/set`.
pub fn match_topic<'a>(template: &str, topic: &'a str) -> Option<&'a str> {
    let (prefix, suffix) = template.split_once("{id}")?;
    let id = topic.strip_prefix(prefix)?.strip_suffix(suffix)?;

    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id)
    }
}

pub fn route<'a>(settings: &Settings, topic: &'a str) -> Option<Route<'a>> {
    if let Some(id) = match_topic(&settings.mqtt.light_topic_set, topic) {
        return Some(Route::Set(id));
    }

    if let Some(prefix) = topic.strip_suffix(EVENTS_SUFFIX) {
        return Some(Route::DeviceEvents(prefix));
    }

    topic.strip_suffix(ONLINE_SUFFIX).map(Route::DeviceOnline)
}

pub async fn handle_incoming_mqtt_event(event: rumqttc::Event, bridge: &Arc<Bridge>) -> Result<()> {
    match event {
        rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_)) => {
            // Subscribing waits on the request queue this loop drains
            let bridge = bridge.clone();
            tokio::spawn(async move {
                if let Err(e) = bridge.subscribe_all().await {
                    log::error!("Failed to subscribe to MQTT topics: {:?}", e);
                }
            });
        }
        rumqttc::Event::Incoming(rumqttc::Packet::Publish(msg)) => {
            handle_publish(msg, bridge).await?;
        }
        _ => {}
    }

    Ok(())
}

async fn handle_publish(msg: Publish, bridge: &Arc<Bridge>) -> Result<()> {
    match route(bridge.settings(), &msg.topic) {
        Some(Route::Set(id)) => {
            let command: MqttDevice = serde_json::from_slice(&msg.payload)?;
            let id = id.to_string();

            // Commands may overlap; the adapters sort that out
            let bridge = bridge.clone();
            tokio::spawn(async move {
                if let Err(e) = bridge.handle_set(&id, command).await {
                    log::error!("Error while processing MQTT message: {:?}", e);
                }
            });
        }
        Some(Route::DeviceEvents(prefix)) => {
            let Some(device) = bridge.device_by_prefix(prefix).await else {
                log::debug!("Ignoring events from unknown device {}", prefix);
                return Ok(());
            };

            let notification: Notification = serde_json::from_slice(&msg.payload)?;
            device.rpc.set_connected(true);

            if let Some(status) = notification.status() {
                log::debug!(
                    "{} from {}",
                    notification.method,
                    notification.src.as_deref().unwrap_or(prefix)
                );
                device.apply_status(status);
            }
        }
        Some(Route::DeviceOnline(prefix)) => {
            let Some(device) = bridge.device_by_prefix(prefix).await else {
                return Ok(());
            };

            let online = msg.payload.as_ref() == b"true";
            log::info!(
                "{} is {}",
                device.name,
                if online { "online" } else { "offline" }
            );
            device.rpc.set_connected(online);
        }
        None => {
            log::debug!("Ignoring message on {}", msg.topic);
        }
    }

    Ok(())
}
