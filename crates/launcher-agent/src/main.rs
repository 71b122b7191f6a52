mod config;
mod desktop;

use std::{error::Error, sync::Arc};

use launcher_control::{ControlService, HttpDataProvider};
use launcher_desktop::DesktopClient;
use launcher_keys::{setup_or_load, JsonFileStore};
use tracing::info;

use crate::{
    config::AgentConfig,
    desktop::{spawn_status_forwarder, DESKTOP_SUBSYSTEM},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    launcher_util::init_tracing()?;
    let cfg = AgentConfig::load();

    let store = JsonFileStore::open(cfg.key_store.clone())?;
    let device_key = setup_or_load(&store)?;
    info!(fingerprint = %device_key.fingerprint(), "device key ready");

    let provider = HttpDataProvider::new(cfg.provider_options())?.with_device_key(device_key);
    let service = Arc::new(
        ControlService::new(Arc::new(provider)).with_request_interval(cfg.request_interval()),
    );

    let forwarder = match cfg.desktop_token.clone() {
        Some(token) => {
            let client = DesktopClient::new(token, cfg.desktop_socket.clone());
            let (consumer, task) = spawn_status_forwarder(client);
            service.register_consumer(DESKTOP_SUBSYSTEM, Arc::new(consumer))?;
            Some(task)
        }
        None => {
            info!("no desktop token configured, status forwarding disabled");
            None
        }
    };

    let run = service.spawn();
    info!(
        agent = %cfg.agent_name,
        control = %cfg.control_addr,
        interval = ?cfg.request_interval(),
        "agent running"
    );

    tokio::signal::ctrl_c().await?;
    info!("interrupted, stopping control service");
    service.stop();
    run.await?;
    if let Some(task) = forwarder {
        task.abort();
    }
    Ok(())
}
