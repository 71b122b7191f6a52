use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("endpoint {path} is still in use: {source}")]
    Busy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to restrict permissions on {path}: {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("auth token must not be empty")]
    EmptyToken,

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("serving desktop endpoint: {0}")]
    Serve(#[source] io::Error),

    #[error("server did not drain within {deadline:?}")]
    DrainTimeout { deadline: Duration },

    #[error("server task failed: {0}")]
    Join(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connecting to {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("http exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("building request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("request to {path} returned status {status}")]
    Status { path: String, status: u16 },

    #[error("request to {path} timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },

    #[error("encoding request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decoding response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ClientError {
    /// True when the server rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status: 401, .. })
    }
}
