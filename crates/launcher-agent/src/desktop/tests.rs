use std::time::Duration;

use launcher_desktop::{DesktopServer, ServerOptions};
use tokio::sync::mpsc;

use super::*;

#[tokio::test]
async fn forwards_status_updates_to_helper() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desktop.sock");
    let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
    let server = DesktopServer::bind(
        ServerOptions {
            socket_path: path.clone(),
            auth_token: "forward-token".into(),
            agent_name: "agent".into(),
        },
        shutdown_tx,
    )
    .await
    .unwrap();
    let mut status = server.status_updates();
    let running = server.spawn();

    let (consumer, task) = spawn_status_forwarder(DesktopClient::new("forward-token", &path));
    consumer.update(br#"{"status": "fail"}"#);

    tokio::time::timeout(Duration::from_secs(2), status.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*status.borrow_and_update(), Some(StatusLevel::Blocking));

    drop(consumer);
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
    running.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn malformed_payload_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (consumer, task) =
        spawn_status_forwarder(DesktopClient::new("t", dir.path().join("absent.sock")));
    consumer.update(b"not json");
    consumer.update(br#"{"status": "healthy", "extra": 1}"#);
    assert_eq!(*consumer.latest.borrow(), None);

    drop(consumer);
    task.await.unwrap();
}
