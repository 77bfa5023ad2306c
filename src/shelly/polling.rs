use std::{sync::Arc, time::Duration};

use crate::{bridge::Bridge, settings::Settings};

use super::device::Device;

/// Fetches the full status of each device and applies it. Returns the number
/// of devices that answered.
pub async fn poll_devices(devices: &[Arc<Device>]) -> usize {
    let mut answered = 0;

    for device in devices {
        match device.get_status().await {
            Ok(status) => {
                device.apply_status(&status);
                answered += 1;
            }
            Err(e) => {
                log::warn!("Failed to poll {} ({}): {:?}", device.name, device.id, e);
            }
        }
    }

    answered
}

/// Periodically poll registered devices for their state.
///
/// Notifications may get lost (broker restarts, MQTT disabled on the device),
/// and we would never know about that from notifications alone.
pub fn start_shelly_state_loop(settings: &Settings, bridge: &Arc<Bridge>) {
    let interval = Duration::from_secs(settings.shelly.poll_interval_seconds);
    let bridge = bridge.clone();

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let devices = bridge.devices().await;
            let answered = poll_devices(&devices).await;

            log::debug!("Polled {}/{} devices", answered, devices.len());
        }
    });
}
