use std::sync::Arc;

use color_eyre::Result;
use shelly_mqtt::{
    bridge::Bridge,
    protocols::{
        http::mk_hyper_http_client,
        mqtt::{mk_mqtt_client, start_mqtt_events_loop},
    },
    settings::read_settings,
    shelly::{
        delegate::DelegateRegistry, discovery::start_discovery_loop,
        polling::start_shelly_state_loop,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();

    let settings = read_settings()?;
    let registry = Arc::new(DelegateRegistry::with_builtin_delegates());
    let (mqtt_client, eventloop) = mk_mqtt_client(&settings);
    let http_client = mk_hyper_http_client();

    let bridge = Bridge::new(&settings, &mqtt_client);

    start_mqtt_events_loop(eventloop, &bridge);
    start_discovery_loop(&settings, &registry, &http_client, &bridge);
    start_shelly_state_loop(&settings, &bridge);

    tokio::signal::ctrl_c().await?;

    log::info!("Shutting down");
    bridge.detach_all().await;

    Ok(())
}
