use std::{fmt, path::PathBuf, time::Duration};

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE, HOST},
    Method, Request,
};
use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tracing::debug;

use crate::{
    endpoint::LocalEndpoint,
    errors::ClientError,
    status::{StatusLevel, StatusRequest},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
struct Pong {
    pong: String,
}

/// Agent-side handle to the desktop helper. Each call opens a fresh
/// connection and is bounded by the client timeout.
#[derive(Clone)]
pub struct DesktopClient {
    endpoint: LocalEndpoint,
    auth_token: String,
    timeout: Duration,
}

impl fmt::Debug for DesktopClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopClient")
            .field("path", &self.endpoint.path())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DesktopClient {
    pub fn new(auth_token: impl Into<String>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: LocalEndpoint::new(socket_path),
            auth_token: auth_token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the agent name the helper answers with.
    pub async fn ping(&self) -> Result<String, ClientError> {
        let body = self.request(Method::GET, "/ping", None).await?;
        let pong: Pong = serde_json::from_slice(&body).map_err(ClientError::Decode)?;
        Ok(pong.pong)
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.request(Method::GET, "/shutdown", None).await?;
        Ok(())
    }

    pub async fn set_status(&self, status: StatusLevel) -> Result<(), ClientError> {
        let body = serde_json::to_vec(&StatusRequest { status }).map_err(ClientError::Encode)?;
        self.request(Method::POST, "/status", Some(body)).await?;
        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Bytes, ClientError> {
        tokio::time::timeout(self.timeout, self.exchange(method, path, body))
            .await
            .map_err(|_| ClientError::Timeout {
                path: path.to_string(),
                timeout: self.timeout,
            })?
    }

    async fn exchange(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Bytes, ClientError> {
        let stream = self
            .endpoint
            .connect()
            .await
            .map_err(|source| ClientError::Connect {
                path: self.endpoint.path().to_path_buf(),
                source,
            })?;
        let (mut sender, connection) =
            hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                debug!(error = %err, "desktop connection closed with error");
            }
        });

        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(HOST, "localhost")
            .header(AUTHORIZATION, format!("Bearer {}", self.auth_token));
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let request = builder.body(Full::new(Bytes::from(body.unwrap_or_default())))?;

        let response = sender.send_request(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        if !status.is_success() {
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(bytes)
    }
}
