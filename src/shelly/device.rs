use std::sync::Arc;

use color_eyre::Result;
use serde_json::{json, Map, Value};

use super::{
    light::Light,
    rpc::RpcHandler,
    status::{parse_component_key, DeviceInfo, LightStatus},
};

/// A device component. Only lights carry behavior here; everything else is
/// declared so its status keys are recognized.
pub enum Component {
    Light(Arc<Light>),
    Aux(AuxComponent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxComponent {
    kind: &'static str,
    id: Option<u8>,
}

impl AuxComponent {
    pub fn new(kind: &'static str) -> Self {
        AuxComponent { kind, id: None }
    }

    pub fn with_id(kind: &'static str, id: u8) -> Self {
        AuxComponent { kind, id: Some(id) }
    }

    fn matches(&self, kind: &str, id: Option<u8>) -> bool {
        self.kind == kind && (self.id.is_none() || self.id == id)
    }
}

impl Component {
    pub fn key(&self) -> String {
        match self {
            Component::Light(light) => light.key(),
            Component::Aux(AuxComponent { kind, id: Some(id) }) => format!("{}:{}", kind, id),
            Component::Aux(AuxComponent { kind, id: None }) => kind.to_string(),
        }
    }
}

pub struct Device {
    pub id: String,
    pub model: &'static str,
    pub name: String,
    pub topic_prefix: String,
    pub rpc: Arc<dyn RpcHandler>,
    components: Vec<Component>,
}

impl Device {
    pub fn new(
        info: &DeviceInfo,
        model: &'static str,
        rpc: Arc<dyn RpcHandler>,
        components: Vec<Component>,
    ) -> Self {
        Device {
            id: info.id.clone(),
            model,
            name: info.name.clone().unwrap_or_else(|| info.id.clone()),
            topic_prefix: info.id.clone(),
            rpc,
            components,
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn lights(&self) -> impl Iterator<Item = &Arc<Light>> {
        self.components.iter().filter_map(|component| match component {
            Component::Light(light) => Some(light),
            Component::Aux(_) => None,
        })
    }

    pub fn light(&self, id: u8) -> Option<&Arc<Light>> {
        self.lights().find(|light| light.id() == id)
    }

    pub async fn get_status(&self) -> Result<Map<String, Value>> {
        let status = self.rpc.request("Shelly.GetStatus", json!({})).await?;

        match status {
            Value::Object(status) => Ok(status),
            other => Err(eyre::eyre!(
                "Expected Shelly.GetStatus to return an object, got: {}",
                other
            )),
        }
    }

    /// Routes component statuses (from `Shelly.GetStatus` or a status
    /// notification) to the components they belong to.
    pub fn apply_status(&self, status: &Map<String, Value>) {
        for (key, value) in status {
            let (kind, id) = parse_component_key(key);

            match (kind, id) {
                ("light", Some(id)) => {
                    let Some(light) = self.light(id) else {
                        log::debug!("{}: no component for {}", self.id, key);
                        continue;
                    };

                    match serde_json::from_value::<LightStatus>(value.clone()) {
                        Ok(light_status) => light.update(&light_status),
                        Err(e) => log::warn!("{}: invalid {} status: {}", self.id, key, e),
                    }
                }
                ("ts", None) => {}
                _ => {
                    let known = self.components.iter().any(|component| match component {
                        Component::Aux(aux) => aux.matches(kind, id),
                        Component::Light(_) => false,
                    });

                    if !known {
                        log::debug!("{}: ignoring status for unknown component {}", self.id, key);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shelly::rpc::fake::FakeRpc;

    fn device(rpc: Arc<FakeRpc>) -> Device {
        let info = DeviceInfo {
            id: "shellytest-0001".to_string(),
            model: "TEST".to_string(),
            name: None,
            gen: Some(2),
            ver: None,
            app: None,
        };

        Device::new(
            &info,
            "TEST",
            rpc.clone(),
            vec![
                Component::Aux(AuxComponent::new("wifi")),
                Component::Light(Arc::new(Light::new(0, rpc.clone()))),
                Component::Light(Arc::new(Light::new(1, rpc))),
            ],
        )
    }

    #[test]
    fn name_and_prefix_default_to_id() {
        let device = device(Arc::new(FakeRpc::connected()));

        assert_eq!(device.name, "shellytest-0001");
        assert_eq!(device.topic_prefix, "shellytest-0001");
    }

    #[test]
    fn routes_light_status_by_index() {
        let device = device(Arc::new(FakeRpc::connected()));

        let status = json!({
            "ts": 1716290000.12,
            "wifi": { "sta_ip": "192.168.1.40", "status": "got ip" },
            "light:1": { "id": 1, "output": true, "brightness": 30 },
            "light:7": { "id": 7, "output": true },
            "switch:0": { "id": 0, "output": true }
        });
        device.apply_status(status.as_object().unwrap());

        let light0 = device.light(0).unwrap();
        let light1 = device.light(1).unwrap();
        assert!(!light0.output());
        assert!(light1.output());
        assert_eq!(light1.brightness(), 30);
    }

    #[test]
    fn invalid_light_status_is_skipped() {
        let device = device(Arc::new(FakeRpc::connected()));

        let status = json!({
            "light:0": { "id": 0, "output": "yes" },
            "light:1": { "id": 1, "output": true }
        });
        device.apply_status(status.as_object().unwrap());

        assert!(!device.light(0).unwrap().output());
        assert!(device.light(1).unwrap().output());
    }

    #[tokio::test]
    async fn get_status_requires_an_object() {
        let rpc = Arc::new(FakeRpc::connected());
        let device = device(rpc.clone());

        rpc.respond("Shelly.GetStatus", json!({ "light:0": { "id": 0 } }));
        assert!(device.get_status().await.unwrap().contains_key("light:0"));

        rpc.respond("Shelly.GetStatus", json!([]));
        assert!(device.get_status().await.is_err());
    }
}
