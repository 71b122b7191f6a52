//! Bearer-token gate in front of every desktop route.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

const BEARER_PREFIX: &str = "Bearer ";

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

fn tokens_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Rejects the request with an empty 401 unless it carries the expected
/// token. Handlers never run for rejected requests.
pub async fn require_auth(
    State(expected): State<Arc<str>>,
    req: Request,
    next: Next,
) -> Response {
    match bearer_token(req.headers()) {
        Some(presented) if tokens_match(presented, &expected) => next.run(req).await,
        Some(_) => {
            debug!(path = %req.uri().path(), "rejected request with invalid token");
            StatusCode::UNAUTHORIZED.into_response()
        }
        None => {
            debug!(path = %req.uri().path(), "rejected request with malformed authorization");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}
