use std::error::Error;

use launcher_desktop::{server::DEFAULT_DRAIN_DEADLINE, DesktopServer, ServerOptions};
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    launcher_util::init_tracing()?;

    let options = ServerOptions::from_env().ok_or("LAUNCHER_DESKTOP_TOKEN must be set")?;
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    let server = DesktopServer::bind(options, shutdown_tx).await?;
    let mut status = server.status_updates();
    let running = server.spawn();
    info!(path = %running.path().display(), "desktop helper listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("agent asked the desktop helper to exit");
                break;
            }
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("interrupted");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(level) = *status.borrow_and_update() {
                    info!(status = %level, "{}", level.description());
                }
            }
        }
    }

    running.shutdown(DEFAULT_DRAIN_DEADLINE).await?;
    Ok(())
}
