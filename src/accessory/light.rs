use std::sync::{Arc, Mutex, PoisonError};

use crate::shelly::{light::Light, listeners::ListenerHandle};

use super::{characteristic::LightbulbService, pending::Pending, HapStatus};

/// State shared between the adapter and the listeners it registers on the
/// channel.
struct Shared {
    light_id: u8,
    service: Arc<LightbulbService>,

    /// Target on/off state being sent to the device.
    pending_output: Pending<bool>,

    /// Target brightness being sent to the device.
    pending_brightness: Pending<u8>,
}

impl Shared {
    fn output_changed(&self, output: bool) {
        log::info!(
            "Light {} status: {}",
            self.light_id,
            if output { "on" } else { "off" }
        );

        // The device confirmed the command in flight
        self.pending_output.clear_if(output);

        self.service.on.update_value(output);
    }

    fn brightness_changed(&self, brightness: u8) {
        log::info!("Light {} status: brightness {}", self.light_id, brightness);

        self.pending_brightness.clear_if(brightness);

        self.service.brightness.update_value(brightness);
    }
}

struct Subscriptions {
    output: ListenerHandle,
    brightness: ListenerHandle,
}

/// Exposes one light channel as a dimmable light service.
pub struct LightAdapter {
    light: Arc<Light>,
    shared: Arc<Shared>,
    subscriptions: Mutex<Option<Subscriptions>>,
}

impl LightAdapter {
    /// Seeds the service from the channel's confirmed state and starts
    /// listening for updates from the device. Call [`LightAdapter::detach`]
    /// when the accessory goes away.
    pub fn new(light: Arc<Light>) -> Self {
        let service = LightbulbService::new(
            format!("Light {}", light.id() + 1),
            format!("light-{}", light.id()),
        );
        service.on.update_value(light.output());
        service.brightness.update_value(light.brightness());

        let shared = Arc::new(Shared {
            light_id: light.id(),
            service: Arc::new(service),
            pending_output: Pending::new(),
            pending_brightness: Pending::new(),
        });

        let output = {
            let shared = shared.clone();
            light.on_output_change(move |output| shared.output_changed(output))
        };
        let brightness = {
            let shared = shared.clone();
            light.on_brightness_change(move |brightness| shared.brightness_changed(brightness))
        };

        LightAdapter {
            light,
            shared,
            subscriptions: Mutex::new(Some(Subscriptions { output, brightness })),
        }
    }

    pub fn light(&self) -> &Arc<Light> {
        &self.light
    }

    pub fn service(&self) -> &Arc<LightbulbService> {
        &self.shared.service
    }

    pub fn pending_output(&self) -> Option<bool> {
        self.shared.pending_output.get()
    }

    pub fn pending_brightness(&self) -> Option<u8> {
        self.shared.pending_brightness.get()
    }

    /// Unregisters the channel listeners. Safe to call more than once.
    pub fn detach(&self) {
        let subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(Subscriptions { output, brightness }) = subscriptions {
            self.light.off_output_change(output);
            self.light.off_brightness_change(brightness);
        }
    }

    /// Handles a write to the On characteristic.
    pub async fn set_output(&self, target: bool) -> Result<(), HapStatus> {
        let id = self.light.id();
        let pending = &self.shared.pending_output;

        if !self.light.connected() {
            log::error!("Light {}: cannot set on/off - device is not connected", id);
            return Err(HapStatus::ServiceCommunicationFailure);
        }

        if !pending.try_set(target) {
            log::debug!(
                "Light {} on/off: skipping redundant command (target: {}, current: {})",
                id,
                target,
                self.light.output()
            );
            return Ok(());
        }

        log::info!(
            "Light {}: setting on/off to {} (current: {})",
            id,
            target,
            self.light.output()
        );

        match self.light.set(Some(target), None).await {
            Ok(()) => {
                pending.clear_if(target);
                Ok(())
            }
            Err(e) => {
                pending.clear();
                log::error!("Light {} failed to set on/off: {}", id, e);
                Err(HapStatus::ServiceCommunicationFailure)
            }
        }
    }

    /// Handles a read of the On characteristic.
    pub fn get_output(&self) -> bool {
        self.light.output()
    }

    pub fn on_output_changed(&self, output: bool) {
        self.shared.output_changed(output);
    }

    /// Handles a write to the Brightness characteristic.
    pub async fn set_brightness(&self, target: u8) -> Result<(), HapStatus> {
        let id = self.light.id();
        let pending = &self.shared.pending_brightness;

        if !self.light.connected() {
            log::error!("Light {}: cannot set brightness - device is not connected", id);
            return Err(HapStatus::ServiceCommunicationFailure);
        }

        if !pending.try_set(target) {
            log::debug!(
                "Light {} brightness: skipping redundant command (target: {}, current: {})",
                id,
                target,
                self.light.brightness()
            );
            return Ok(());
        }

        log::info!(
            "Light {}: setting brightness to {} (current: {})",
            id,
            target,
            self.light.brightness()
        );

        match self.light.set(None, Some(target)).await {
            Ok(()) => {
                pending.clear_if(target);
                Ok(())
            }
            Err(e) => {
                pending.clear();
                log::error!("Light {} failed to set brightness: {}", id, e);
                Err(HapStatus::ServiceCommunicationFailure)
            }
        }
    }

    /// Handles a read of the Brightness characteristic.
    pub fn get_brightness(&self) -> u8 {
        self.light.brightness()
    }

    pub fn on_brightness_changed(&self, brightness: u8) {
        self.shared.brightness_changed(brightness);
    }
}
