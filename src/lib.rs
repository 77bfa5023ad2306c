pub mod accessory;
pub mod bridge;
pub mod mqtt;
pub mod protocols;
pub mod settings;
pub mod shelly;
