use std::sync::{Arc, Mutex, PoisonError};

use color_eyre::Result;
use serde_json::{json, Map, Value};

use super::{
    listeners::{ListenerHandle, Listeners},
    rpc::RpcHandler,
    status::LightStatus,
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct LightState {
    output: bool,
    brightness: u8,
}

/// A `light:N` component: one dimmer channel of a device.
///
/// Holds the last values the device reported. Commands sent through
/// [`Light::set`] do not touch that state; it only changes when the device
/// reports back through [`Light::update`].
pub struct Light {
    id: u8,
    rpc: Arc<dyn RpcHandler>,
    state: Mutex<LightState>,
    output_listeners: Listeners<bool>,
    brightness_listeners: Listeners<u8>,
}

impl Light {
    pub fn new(id: u8, rpc: Arc<dyn RpcHandler>) -> Self {
        Light {
            id,
            rpc,
            state: Mutex::new(LightState::default()),
            output_listeners: Listeners::new(),
            brightness_listeners: Listeners::new(),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn key(&self) -> String {
        format!("light:{}", self.id)
    }

    fn state(&self) -> LightState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn output(&self) -> bool {
        self.state().output
    }

    pub fn brightness(&self) -> u8 {
        self.state().brightness
    }

    /// Whether the owning device is reachable.
    pub fn connected(&self) -> bool {
        self.rpc.connected()
    }

    /// Sends `Light.Set` with whichever of the two properties are given.
    pub async fn set(&self, output: Option<bool>, brightness: Option<u8>) -> Result<()> {
        let mut params = Map::new();
        params.insert("id".to_string(), json!(self.id));

        if let Some(output) = output {
            params.insert("on".to_string(), json!(output));
        }

        if let Some(brightness) = brightness {
            params.insert("brightness".to_string(), json!(brightness.min(100)));
        }

        self.rpc.request("Light.Set", Value::Object(params)).await?;

        Ok(())
    }

    pub fn on_output_change(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> ListenerHandle {
        self.output_listeners.on(listener)
    }

    pub fn on_brightness_change(
        &self,
        listener: impl Fn(u8) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.brightness_listeners.on(listener)
    }

    pub fn off_output_change(&self, handle: ListenerHandle) -> bool {
        self.output_listeners.off(handle)
    }

    pub fn off_brightness_change(&self, handle: ListenerHandle) -> bool {
        self.brightness_listeners.off(handle)
    }

    /// Applies a (possibly partial) status report and emits a change event
    /// for each property whose value differs from the stored one.
    pub fn update(&self, status: &LightStatus) {
        let (output_changed, brightness_changed) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let before = *state;

            if let Some(output) = status.output {
                state.output = output;
            }

            if let Some(brightness) = status.brightness {
                state.brightness = brightness;
            }

            (
                (state.output != before.output).then_some(state.output),
                (state.brightness != before.brightness).then_some(state.brightness),
            )
        };

        if let Some(output) = output_changed {
            self.output_listeners.emit(output);
        }

        if let Some(brightness) = brightness_changed {
            self.brightness_listeners.emit(brightness);
        }
    }
}
