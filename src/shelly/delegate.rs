use std::{collections::HashMap, sync::Arc};

use crate::accessory::light::LightAdapter;

use super::{device::Device, devices, rpc::RpcHandler, status::DeviceInfo};

/// Describes how a device model is exposed: which device object to build for
/// it, and which accessory adapters to create from that device.
pub struct DeviceDelegate {
    pub model: &'static str,
    pub model_name: &'static str,
    pub build: fn(&DeviceInfo, Arc<dyn RpcHandler>) -> Device,
    pub setup: fn(&Device) -> Vec<LightAdapter>,
}

/// Model to delegate lookup. Built once at startup and read-only after that.
#[derive(Default)]
pub struct DelegateRegistry {
    delegates: HashMap<&'static str, &'static DeviceDelegate>,
}

impl DelegateRegistry {
    pub fn with_builtin_delegates() -> Self {
        let mut registry = DelegateRegistry::default();
        registry.register(&devices::plus_rgbw_pm::DELEGATE);
        registry
    }

    pub fn register(&mut self, delegate: &'static DeviceDelegate) {
        if let Some(previous) = self.delegates.insert(delegate.model, delegate) {
            log::warn!(
                "Delegate for {} ({}) replaced",
                previous.model,
                previous.model_name
            );
        }
    }

    pub fn get(&self, model: &str) -> Option<&'static DeviceDelegate> {
        self.delegates.get(model).copied()
    }
}
