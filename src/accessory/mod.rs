use std::{fmt, sync::Arc};

use self::{characteristic::LightbulbService, light::LightAdapter};

pub mod characteristic;
pub mod light;
pub mod pending;

/// Status reported back to the bridge when a characteristic handler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapStatus {
    /// The device could not be reached, or rejected the command.
    ServiceCommunicationFailure,
}

impl fmt::Display for HapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HapStatus::ServiceCommunicationFailure => write!(f, "service communication failure"),
        }
    }
}

impl std::error::Error for HapStatus {}

/// A bridged accessory: one light service backed by one adapter.
pub struct Accessory {
    pub id: String,
    pub name: String,
    pub adapter: LightAdapter,
}

impl Accessory {
    pub fn new(device_id: &str, device_name: &str, adapter: LightAdapter) -> Self {
        Accessory {
            id: format!("{}-{}", device_id, adapter.service().subtype),
            name: format!("{} {}", device_name, adapter.service().name),
            adapter,
        }
    }

    pub fn service(&self) -> &Arc<LightbulbService> {
        self.adapter.service()
    }
}
