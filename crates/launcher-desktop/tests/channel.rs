#![cfg(unix)]

use std::time::Duration;

use launcher_desktop::{
    ClientError, DesktopClient, DesktopServer, ServerError, ServerOptions, StatusLevel,
};
use tokio::{io::AsyncWriteExt as _, net::UnixStream, sync::mpsc};

const TOKEN: &str = "channel-token";

fn options(dir: &tempfile::TempDir) -> ServerOptions {
    ServerOptions {
        socket_path: dir.path().join("run").join("desktop.sock"),
        auth_token: TOKEN.to_string(),
        agent_name: "channel-agent".to_string(),
    }
}

#[tokio::test]
async fn client_drives_server_over_unix_socket() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(&dir);
    let path = opts.socket_path.clone();
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    let server = DesktopServer::bind(opts, shutdown_tx).await.unwrap();
    let mut status = server.status_updates();
    let running = server.spawn();
    assert!(path.exists());

    let client = DesktopClient::new(TOKEN, &path);
    assert_eq!(client.ping().await.unwrap(), "channel-agent");

    client.set_status(StatusLevel::Blocking).await.unwrap();
    status.changed().await.unwrap();
    assert_eq!(*status.borrow_and_update(), Some(StatusLevel::Blocking));

    client.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), shutdown_rx.recv())
        .await
        .unwrap()
        .unwrap();

    running.shutdown(Duration::from_secs(5)).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(&dir);
    let path = opts.socket_path.clone();
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    let running = DesktopServer::bind(opts, shutdown_tx).await.unwrap().spawn();

    let client = DesktopClient::new("not-the-token", &path);
    let err = client.shutdown().await.unwrap_err();
    assert!(err.is_unauthorized(), "{err}");
    assert!(shutdown_rx.try_recv().is_err());

    running.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn bind_replaces_stale_socket_file() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(&dir);
    let path = opts.socket_path.clone();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"left behind by a crashed helper").unwrap();

    let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
    let running = DesktopServer::bind(opts, shutdown_tx).await.unwrap().spawn();

    let client = DesktopClient::new(TOKEN, &path);
    assert_eq!(client.ping().await.unwrap(), "channel-agent");

    running.shutdown(Duration::from_secs(5)).await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn client_reports_missing_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let client = DesktopClient::new(TOKEN, dir.path().join("nobody-home.sock"));
    let err = client.ping().await.unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }), "{err}");
}

#[tokio::test]
async fn stalled_request_forces_drain_timeout_and_still_removes_socket() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(&dir);
    let path = opts.socket_path.clone();
    let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
    let running = DesktopServer::bind(opts, shutdown_tx).await.unwrap().spawn();

    // Headers promise a body that never fully arrives.
    let mut stream = UnixStream::connect(&path).await.unwrap();
    let head = format!(
        "POST /status HTTP/1.1\r\nHost: localhost\r\nAuthorization: Bearer {TOKEN}\r\n\
         Content-Type: application/json\r\nContent-Length: 64\r\n\r\n{{\"status\""
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let deadline = Duration::from_millis(300);
    let started = tokio::time::Instant::now();
    let err = running.shutdown(deadline).await.unwrap_err();
    assert!(
        matches!(err, ServerError::DrainTimeout { deadline: d } if d == deadline),
        "{err}"
    );
    assert!(started.elapsed() >= deadline);
    assert!(!path.exists());
    drop(stream);
}
