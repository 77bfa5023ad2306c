//! Shelly Plus RGBW PM.
//!
//! Treated as a 4-channel dimmer with on/off and brightness control through
//! the Light components (`light:0` through `light:3`). Each channel becomes a
//! separate dimmable light accessory. Color control is not available.
//!
//! This assumes the device exposes `light:0` through `light:3` in its API.
//! If the firmware is in RGB(W) mode and reports an `rgb:0` component
//! instead, this profile will not control anything and proper RGB component
//! support is needed.

use std::sync::Arc;

use crate::{
    accessory::light::LightAdapter,
    shelly::{
        delegate::DeviceDelegate,
        device::{AuxComponent, Component, Device},
        light::Light,
        rpc::RpcHandler,
        status::DeviceInfo,
    },
};

pub const MODEL: &str = "SNDC-0D4P10WW";
pub const MODEL_NAME: &str = "Shelly Plus RGBW PM";

pub static DELEGATE: DeviceDelegate = DeviceDelegate {
    model: MODEL,
    model_name: MODEL_NAME,
    build,
    setup,
};

fn build(info: &DeviceInfo, rpc: Arc<dyn RpcHandler>) -> Device {
    let light = |id| Component::Light(Arc::new(Light::new(id, rpc.clone())));

    let components = vec![
        Component::Aux(AuxComponent::new("wifi")),
        Component::Aux(AuxComponent::new("eth")),
        Component::Aux(AuxComponent::new("ble")),
        Component::Aux(AuxComponent::new("cloud")),
        Component::Aux(AuxComponent::new("mqtt")),
        Component::Aux(AuxComponent::new("ws")),
        Component::Aux(AuxComponent::with_id("input", 0)),
        light(0),
        light(1),
        light(2),
        light(3),
        Component::Aux(AuxComponent::new("script")),
        Component::Aux(AuxComponent::new("ui")),
    ];

    Device::new(info, MODEL, rpc, components)
}

fn setup(device: &Device) -> Vec<LightAdapter> {
    device.lights().cloned().map(LightAdapter::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shelly::rpc::fake::FakeRpc;

    fn info() -> DeviceInfo {
        DeviceInfo {
            id: "shellyplusrgbwpm-a0a3b3c4d5e6".to_string(),
            model: MODEL.to_string(),
            name: Some("Kitchen".to_string()),
            gen: Some(2),
            ver: Some("1.3.1".to_string()),
            app: Some("PlusRGBWPM".to_string()),
        }
    }

    #[test]
    fn declares_components_in_order() {
        let device = (DELEGATE.build)(&info(), Arc::new(FakeRpc::connected()));

        let keys: Vec<String> = device.components().iter().map(Component::key).collect();

        assert_eq!(
            keys,
            vec![
                "wifi", "eth", "ble", "cloud", "mqtt", "ws", "input:0", "light:0", "light:1",
                "light:2", "light:3", "script", "ui",
            ]
        );
        assert_eq!(device.model, MODEL);
        assert_eq!(device.name, "Kitchen");
    }

    #[test]
    fn one_adapter_per_channel() {
        let device = (DELEGATE.build)(&info(), Arc::new(FakeRpc::connected()));

        let adapters = (DELEGATE.setup)(&device);

        let ids: Vec<u8> = adapters.iter().map(|adapter| adapter.light().id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(adapters[2].service().name, "Light 3");
        assert_eq!(adapters[2].service().subtype, "light-2");
    }
}
