use std::{sync::Arc, time::Duration};

use color_eyre::Result;
use eyre::eyre;
use serde_json::json;

use crate::{
    accessory::light::LightAdapter,
    bridge::Bridge,
    protocols::http::HyperHttpClient,
    settings::{Settings, ShellyDeviceSettings},
};

use super::{
    delegate::DelegateRegistry,
    device::Device,
    rpc::{HttpRpcHandler, RpcHandler},
    status::DeviceInfo,
};

/// Source name sent along with RPC requests.
const RPC_SRC: &str = "shelly-mqtt";

/// Identifies the device behind `rpc`, builds it through the delegate
/// registered for its model and seeds it with the current status.
pub async fn discover_device(
    device_settings: &ShellyDeviceSettings,
    registry: &DelegateRegistry,
    rpc: Arc<dyn RpcHandler>,
) -> Result<(Arc<Device>, Vec<LightAdapter>)> {
    let info = rpc.request("Shelly.GetDeviceInfo", json!({})).await?;
    let info: DeviceInfo = serde_json::from_value(info)?;

    let delegate = registry.get(&info.model).ok_or_else(|| {
        eyre!(
            "Unsupported device model {} at {} ({})",
            info.model,
            device_settings.addr,
            info.id
        )
    })?;

    log::info!(
        "Found {} {} at {} (gen {}, firmware {})",
        delegate.model_name,
        info.id,
        device_settings.addr,
        info.gen.map(|generation| generation.to_string()).as_deref().unwrap_or("?"),
        info.ver.as_deref().or(info.app.as_deref()).unwrap_or("?"),
    );

    let mut device = (delegate.build)(&info, rpc);

    if let Some(topic_prefix) = &device_settings.topic_prefix {
        device.topic_prefix = topic_prefix.clone();
    }

    if let Some(name) = &device_settings.name {
        device.name = name.clone();
    }

    let status = device.get_status().await?;
    device.apply_status(&status);

    let adapters = (delegate.setup)(&device);

    Ok((Arc::new(device), adapters))
}

/// Keeps trying each configured device until it is registered with the
/// bridge.
pub fn start_discovery_loop(
    settings: &Settings,
    registry: &Arc<DelegateRegistry>,
    http_client: &HyperHttpClient,
    bridge: &Arc<Bridge>,
) {
    let retry = Duration::from_secs(settings.shelly.discovery_retry_seconds);
    let timeout = Duration::from_secs(settings.shelly.rpc_timeout_seconds);

    for device_settings in settings.shelly.devices.clone() {
        let registry = registry.clone();
        let http_client = http_client.clone();
        let bridge = bridge.clone();

        tokio::spawn(async move {
            loop {
                let result = async {
                    let rpc = HttpRpcHandler::new(
                        &device_settings.addr,
                        RPC_SRC,
                        http_client.clone(),
                        timeout,
                    )?;
                    let (device, adapters) =
                        discover_device(&device_settings, &registry, Arc::new(rpc)).await?;

                    bridge.register_device(device, adapters).await
                }
                .await;

                match result {
                    Ok(()) => break,
                    Err(e) => {
                        log::warn!(
                            "Could not set up device at {}, retrying in {:?}: {:?}",
                            device_settings.addr,
                            retry,
                            e
                        );
                        tokio::time::sleep(retry).await;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shelly::{devices::plus_rgbw_pm, rpc::fake::FakeRpc};

    fn device_settings() -> ShellyDeviceSettings {
        ShellyDeviceSettings {
            addr: "192.168.1.40".to_string(),
            topic_prefix: None,
            name: None,
        }
    }

    fn rpc_for(model: &str) -> Arc<FakeRpc> {
        let rpc = Arc::new(FakeRpc::connected());
        rpc.respond(
            "Shelly.GetDeviceInfo",
            json!({
                "id": "shellyplusrgbwpm-a0a3b3c4d5e6",
                "model": model,
                "gen": 2,
                "ver": "1.3.1",
                "app": "PlusRGBWPM"
            }),
        );
        rpc.respond(
            "Shelly.GetStatus",
            json!({
                "light:0": { "id": 0, "output": true, "brightness": 20 },
                "light:3": { "id": 3, "output": false, "brightness": 90 },
                "sys": { "mac": "A0A3B3C4D5E6" }
            }),
        );
        rpc
    }

    #[tokio::test]
    async fn builds_device_with_current_state() {
        let registry = DelegateRegistry::with_builtin_delegates();
        let rpc = rpc_for(plus_rgbw_pm::MODEL);

        let (device, adapters) = discover_device(&device_settings(), &registry, rpc.clone())
            .await
            .unwrap();

        assert_eq!(device.id, "shellyplusrgbwpm-a0a3b3c4d5e6");
        assert_eq!(device.topic_prefix, "shellyplusrgbwpm-a0a3b3c4d5e6");
        assert_eq!(adapters.len(), 4);
        assert!(adapters[0].get_output());
        assert!(adapters[0].service().on.value());
        assert_eq!(adapters[3].get_brightness(), 90);

        let methods: Vec<String> = rpc.calls().into_iter().map(|(method, _)| method).collect();
        assert_eq!(methods, vec!["Shelly.GetDeviceInfo", "Shelly.GetStatus"]);
    }

    #[tokio::test]
    async fn settings_override_prefix_and_name() {
        let registry = DelegateRegistry::with_builtin_delegates();
        let settings = ShellyDeviceSettings {
            topic_prefix: Some("shellies/kitchen".to_string()),
            name: Some("Kitchen".to_string()),
            ..device_settings()
        };

        let (device, _adapters) =
            discover_device(&settings, &registry, rpc_for(plus_rgbw_pm::MODEL))
                .await
                .unwrap();

        assert_eq!(device.topic_prefix, "shellies/kitchen");
        assert_eq!(device.name, "Kitchen");
    }

    #[tokio::test]
    async fn unsupported_model() {
        let registry = DelegateRegistry::with_builtin_delegates();
        let rpc = rpc_for("SNSW-001X16EU");

        let result = discover_device(&device_settings(), &registry, rpc.clone()).await;

        let error = result.err().unwrap().to_string();
        assert!(error.contains("SNSW-001X16EU"));
        assert_eq!(rpc.calls().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_device() {
        let registry = DelegateRegistry::with_builtin_delegates();
        let rpc = rpc_for(plus_rgbw_pm::MODEL);
        rpc.fail_requests(true);

        assert!(discover_device(&device_settings(), &registry, rpc)
            .await
            .is_err());
    }
}
