pub mod delegate;
pub mod device;
pub mod devices;
pub mod discovery;
pub mod light;
pub mod listeners;
pub mod polling;
pub mod rpc;
pub mod status;
