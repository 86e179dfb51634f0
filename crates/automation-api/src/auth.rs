//! API key authentication
//!
//! Every HTTP route requires the `X-API-KEY` header to match the key in the
//! config entry. The push channel checks the same key during its auth phase.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Constant-time comparison of a presented key against the expected one
pub fn verify_key(presented: Option<&str>, expected: Option<&str>) -> bool {
    match (presented, expected) {
        (Some(presented), Some(expected)) => {
            bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
        }
        _ => false,
    }
}

fn header_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

/// Middleware rejecting requests without a valid API key
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !verify_key(header_key(request.headers()), state.api_key()) {
        warn!(
            "Rejected {} {}: missing or invalid API key",
            request.method(),
            request.uri().path()
        );
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}
