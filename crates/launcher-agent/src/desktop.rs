//! Forwards the `desktop` control subsystem to the UI helper.

use launcher_control::Consumer;
use launcher_desktop::{DesktopClient, StatusLevel, StatusRequest};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

pub(crate) const DESKTOP_SUBSYSTEM: &str = "desktop";

/// Registry consumer that records the latest requested status. Delivery
/// happens on the forwarding task so dispatch never waits on the helper.
pub(crate) struct DesktopStatusConsumer {
    latest: watch::Sender<Option<StatusLevel>>,
}

impl Consumer for DesktopStatusConsumer {
    fn update(&self, data: &[u8]) {
        match serde_json::from_slice::<StatusRequest>(data) {
            Ok(req) => {
                self.latest.send_replace(Some(req.status));
            }
            Err(err) => warn!("ignoring malformed desktop payload: {err}"),
        }
    }
}

/// Starts the task that pushes status changes to the helper. Only the most
/// recent status is delivered when updates arrive faster than the helper
/// answers. The task ends once the consumer is dropped.
pub(crate) fn spawn_status_forwarder(client: DesktopClient) -> (DesktopStatusConsumer, JoinHandle<()>) {
    let (latest, mut rx) = watch::channel(None);
    let task = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let Some(status) = *rx.borrow_and_update() else {
                continue;
            };
            match client.set_status(status).await {
                Ok(()) => debug!(%status, "desktop status delivered"),
                Err(err) => warn!(%status, "failed to deliver desktop status: {err}"),
            }
        }
    });
    (DesktopStatusConsumer { latest }, task)
}

#[cfg(all(test, unix))]
mod tests;
