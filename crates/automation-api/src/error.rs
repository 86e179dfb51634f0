//! API errors and their HTTP representation

use std::path::PathBuf;

use automation_host::{HostError, ServiceError, StorageError};
use automation_store::{StoreError, ValidationError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Everything an API operation can fail with
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid API key")]
    Unauthorized,

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("host request failed: {0}")]
    Host(#[from] HostError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("config entry storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::InvalidJson(_) => "invalid_json",
            ApiError::Validation(_) | ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Host(_) => "host_error",
            ApiError::Store(_) | ApiError::Storage(_) => "storage_error",
            ApiError::Io { .. } => "io_error",
            ApiError::Serialization(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidJson(_) | ApiError::Validation(_) | ApiError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Host(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_)
            | ApiError::Storage(_)
            | ApiError::Io { .. }
            | ApiError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<ApiError> for ServiceError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidJson(_) | ApiError::Validation(_) | ApiError::InvalidRequest(_) => {
                ServiceError::InvalidData(err.to_string())
            }
            other => ServiceError::CallFailed(other.to_string()),
        }
    }
}
