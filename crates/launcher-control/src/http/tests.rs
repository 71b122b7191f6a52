use std::net::SocketAddr;

use axum::{
    http::{HeaderMap, StatusCode as AxumStatus},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use launcher_keys::{setup_or_load, MemoryStore};
use tokio::net::TcpListener;

use super::*;

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({"alpha": "/r/alpha", "beta": "r/beta"}))
}

async fn alpha(headers: HeaderMap) -> impl IntoResponse {
    let cached = headers
        .get("if-none-match")
        .and_then(|value| value.to_str().ok());
    if cached == Some("v1") {
        return (AxumStatus::NOT_MODIFIED, [("etag", "v1")], Vec::new());
    }
    (AxumStatus::OK, [("etag", "v1")], b"alpha-body".to_vec())
}

async fn broken() -> AxumStatus {
    AxumStatus::INTERNAL_SERVER_ERROR
}

async fn signed(headers: HeaderMap) -> AxumStatus {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let (Some(public), Some(timestamp), Some(signature)) = (
        header(PUBLIC_KEY_HEADER),
        header(TIMESTAMP_HEADER),
        header(SIGNATURE_HEADER),
    ) else {
        return AxumStatus::UNAUTHORIZED;
    };
    let public: [u8; 32] = general_purpose::STANDARD
        .decode(public)
        .unwrap()
        .try_into()
        .unwrap();
    let signature: [u8; 64] = general_purpose::STANDARD
        .decode(signature)
        .unwrap()
        .try_into()
        .unwrap();
    let key = VerifyingKey::from_bytes(&public).unwrap();
    let message = signing_message("GET", "/signed", &timestamp);
    match key.verify(message.as_bytes(), &Signature::from_bytes(&signature)) {
        Ok(()) => AxumStatus::OK,
        Err(_) => AxumStatus::UNAUTHORIZED,
    }
}

async fn spawn_control_server() -> SocketAddr {
    let app = Router::new()
        .route(DEFAULT_ROOT_PATH, get(root))
        .route("/r/alpha", get(alpha))
        .route("/r/beta", get(|| async { "beta-body" }))
        .route("/r/broken", get(broken))
        .route("/signed", get(signed));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn provider_for(addr: SocketAddr) -> HttpDataProvider {
    HttpDataProvider::new(HttpProviderOptions {
        addr: addr.to_string(),
        disable_tls: true,
        ..HttpProviderOptions::default()
    })
    .unwrap()
}

#[test]
fn scheme_follows_tls_options() {
    let secure = HttpDataProvider::new(HttpProviderOptions {
        addr: "control.example.com".into(),
        ..HttpProviderOptions::default()
    })
    .unwrap();
    assert_eq!(secure.base_url().scheme(), "https");

    let plain = HttpDataProvider::new(HttpProviderOptions {
        addr: "localhost:8080".into(),
        disable_tls: true,
        insecure: true,
        ..HttpProviderOptions::default()
    })
    .unwrap();
    assert_eq!(plain.base_url().scheme(), "http");
    assert_eq!(
        plain.resolve("").unwrap().as_str(),
        "http://localhost:8080/api/v1/control"
    );
    assert_eq!(
        plain.resolve("r/x").unwrap().as_str(),
        "http://localhost:8080/r/x"
    );
    assert_eq!(
        plain.resolve("https://cdn.example.com/blob").unwrap().as_str(),
        "https://cdn.example.com/blob"
    );
}

#[tokio::test]
async fn root_map_is_served_from_root_path() {
    let provider = provider_for(spawn_control_server().await);
    let fetched = provider.get("", None).await.unwrap();
    let map: std::collections::BTreeMap<String, String> =
        serde_json::from_slice(&fetched.data).unwrap();
    assert_eq!(map["alpha"], "/r/alpha");
    assert_eq!(map["beta"], "r/beta");
}

#[tokio::test]
async fn conditional_get_maps_not_modified_to_cached_tag() {
    let provider = provider_for(spawn_control_server().await);

    let first = provider.get("/r/alpha", None).await.unwrap();
    assert_eq!(first.etag, "v1");
    assert_eq!(first.data, b"alpha-body");

    let second = provider.get("/r/alpha", Some("v1")).await.unwrap();
    assert_eq!(second.etag, "v1");
    assert!(second.data.is_empty());

    let empty_tag = provider.get("/r/alpha", Some("")).await.unwrap();
    assert_eq!(empty_tag.data, b"alpha-body");
}

#[tokio::test]
async fn missing_etag_yields_empty_tag() {
    let provider = provider_for(spawn_control_server().await);
    let fetched = provider.get("r/beta", None).await.unwrap();
    assert_eq!(fetched.etag, "");
    assert_eq!(fetched.data, b"beta-body");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let provider = provider_for(spawn_control_server().await);

    let err = provider.get("/r/broken", None).await.unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 500, .. }));

    let err = provider.get("/r/missing", None).await.unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 404, .. }));
}

#[tokio::test]
async fn requests_are_signed_with_the_device_key() {
    let addr = spawn_control_server().await;
    let key = setup_or_load(&MemoryStore::new()).unwrap();

    let unsigned = provider_for(addr);
    assert!(matches!(
        unsigned.get("/signed", None).await.unwrap_err(),
        ProviderError::Status { status: 401, .. }
    ));

    let signed = provider_for(addr).with_device_key(key);
    signed.get("/signed", None).await.unwrap();
}
