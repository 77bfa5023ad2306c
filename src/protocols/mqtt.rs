use std::{sync::Arc, time::Duration};

use rumqttc::{AsyncClient, EventLoop, MqttOptions};

use crate::{bridge::Bridge, mqtt::events::handle_incoming_mqtt_event, settings::Settings};

#[derive(Clone)]
pub struct MqttClient {
    pub client: AsyncClient,
}

pub fn mk_mqtt_client(settings: &Settings) -> (MqttClient, EventLoop) {
    let mut options = MqttOptions::new(
        settings.mqtt.client_id(),
        settings.mqtt.host.clone(),
        settings.mqtt.port,
    );
    options.set_keep_alive(Duration::from_secs(5));
    let (client, eventloop) = AsyncClient::new(options, 10);

    (MqttClient { client }, eventloop)
}

/// Drives the MQTT connection and hands incoming events to the bridge.
/// Subscriptions are (re)made by the bridge on every ConnAck.
pub fn start_mqtt_events_loop(mut eventloop: EventLoop, bridge: &Arc<Bridge>) {
    let bridge = bridge.clone();

    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(event) => {
                    if let Err(e) = handle_incoming_mqtt_event(event, &bridge).await {
                        log::error!("Error while handling MQTT event: {:?}", e);
                    }
                }
                Err(e) => {
                    log::warn!("MQTT connection error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });
}
