use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use color_eyre::Result;
use eyre::eyre;
use rumqttc::QoS;
use tokio::sync::RwLock;

use crate::{
    accessory::{light::LightAdapter, Accessory},
    mqtt::mqtt_device::{publish_mqtt_device, MqttDevice},
    protocols::mqtt::MqttClient,
    settings::Settings,
    shelly::device::Device,
};

/// Owns the discovered devices and the accessories exposed for them.
pub struct Bridge {
    settings: Settings,
    mqtt_client: MqttClient,

    /// Devices by MQTT topic prefix
    devices: RwLock<HashMap<String, Arc<Device>>>,

    /// Accessories by id
    accessories: RwLock<HashMap<String, Arc<Accessory>>>,
}

impl Bridge {
    pub fn new(settings: &Settings, mqtt_client: &MqttClient) -> Arc<Self> {
        Arc::new(Bridge {
            settings: settings.clone(),
            mqtt_client: mqtt_client.clone(),
            devices: RwLock::new(HashMap::new()),
            accessories: RwLock::new(HashMap::new()),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn devices(&self) -> Vec<Arc<Device>> {
        self.devices.read().await.values().cloned().collect()
    }

    pub async fn device_by_prefix(&self, prefix: &str) -> Option<Arc<Device>> {
        self.devices.read().await.get(prefix).cloned()
    }

    pub async fn accessory(&self, id: &str) -> Option<Arc<Accessory>> {
        self.accessories.read().await.get(id).cloned()
    }

    /// Exposes a discovered device through the given adapters.
    pub async fn register_device(
        &self,
        device: Arc<Device>,
        adapters: Vec<LightAdapter>,
    ) -> Result<()> {
        {
            let mut devices = self.devices.write().await;

            if devices.contains_key(&device.topic_prefix) {
                for adapter in &adapters {
                    adapter.detach();
                }

                return Err(eyre!(
                    "A device with topic prefix {} is already registered",
                    device.topic_prefix
                ));
            }

            devices.insert(device.topic_prefix.clone(), device.clone());
        }

        let mut ids = Vec::with_capacity(adapters.len());

        {
            let mut accessories = self.accessories.write().await;

            for adapter in adapters {
                let accessory = Arc::new(Accessory::new(&device.id, &device.name, adapter));
                log::info!("Exposing {} as {}", accessory.name, accessory.id);

                start_accessory_publisher(&accessory, &self.mqtt_client, &self.settings);
                ids.push(accessory.id.clone());
                accessories.insert(accessory.id.clone(), accessory);
            }
        }

        if let Err(e) = self.subscribe_device(&device).await {
            // Undo the registration so that a later discovery attempt can retry
            self.unregister_device(&device.topic_prefix, &ids).await;
            return Err(e);
        }

        Ok(())
    }

    async fn unregister_device(&self, prefix: &str, accessory_ids: &[String]) {
        self.devices.write().await.remove(prefix);

        let removed: Vec<Arc<Accessory>> = {
            let mut accessories = self.accessories.write().await;
            accessory_ids
                .iter()
                .filter_map(|id| accessories.remove(id))
                .collect()
        };

        for accessory in removed {
            accessory.adapter.detach();
        }
    }

    async fn subscribe_device(&self, device: &Device) -> Result<()> {
        let client = &self.mqtt_client.client;

        client
            .subscribe(format!("{}/events/rpc", device.topic_prefix), QoS::AtMostOnce)
            .await?;
        client
            .subscribe(format!("{}/online", device.topic_prefix), QoS::AtMostOnce)
            .await?;

        Ok(())
    }

    /// Subscribes to accessory commands and to every known device.
    pub async fn subscribe_all(&self) -> Result<()> {
        self.mqtt_client
            .client
            .subscribe(
                self.settings.mqtt.light_topic_set.replace("{id}", "+"),
                QoS::AtMostOnce,
            )
            .await?;

        for device in self.devices().await {
            self.subscribe_device(&device).await?;
        }

        Ok(())
    }

    /// Forwards a set command to the accessory's adapter. On failure the
    /// current confirmed state is republished so that clients revert.
    pub async fn handle_set(&self, id: &str, command: MqttDevice) -> Result<()> {
        let accessory = self
            .accessory(id)
            .await
            .ok_or_else(|| eyre!("Unknown accessory: {}", id))?;
        let adapter = &accessory.adapter;

        let (power, brightness) = tokio::join!(
            async {
                match command.power {
                    Some(power) => adapter.set_output(power).await,
                    None => Ok(()),
                }
            },
            async {
                match command.brightness_level() {
                    Some(brightness) => adapter.set_brightness(brightness).await,
                    None => Ok(()),
                }
            },
        );

        if let Err(e) = power.and(brightness) {
            let state = MqttDevice::from_accessory(&accessory)?;
            publish_mqtt_device(&self.mqtt_client, &self.settings, &state).await?;

            return Err(eyre!("Failed to set {}: {}", accessory.name, e));
        }

        Ok(())
    }

    /// Unregisters every adapter from its channel.
    pub async fn detach_all(&self) {
        let accessories: Vec<Arc<Accessory>> = self
            .accessories
            .write()
            .await
            .drain()
            .map(|(_, accessory)| accessory)
            .collect();

        for accessory in accessories {
            accessory.adapter.detach();
        }
    }
}

/// Publishes the accessory whenever one of its characteristics is updated.
/// Stops once the accessory is dropped.
fn start_accessory_publisher(
    accessory: &Arc<Accessory>,
    mqtt_client: &MqttClient,
    settings: &Settings,
) {
    let mut on = accessory.service().on.subscribe();
    let mut brightness = accessory.service().brightness.subscribe();
    let accessory: Weak<Accessory> = Arc::downgrade(accessory);
    let mqtt_client = mqtt_client.clone();
    let settings = settings.clone();

    tokio::spawn(async move {
        loop {
            let Some(current) = accessory.upgrade() else {
                break;
            };

            let result = match MqttDevice::from_accessory(&current) {
                Ok(state) => publish_mqtt_device(&mqtt_client, &settings, &state).await,
                Err(e) => Err(e),
            };
            drop(current);

            if let Err(e) = result {
                log::error!("{:?}", e);
            }

            let changed = tokio::select! {
                changed = on.changed() => changed,
                changed = brightness.changed() => changed,
            };

            if changed.is_err() {
                break;
            }
        }
    });
}
