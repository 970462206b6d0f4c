//! The service-wide error taxonomy.
//!
//! Every public operation returns [`ServiceError`]. Validation errors are raised
//! before any store is touched; store and provider failures during a multi-write
//! submit surface as a single aggregate failure (the first branch error).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or invalid credential. No store access has occurred.
    #[error("unauthorized")]
    Unauthorized,

    /// Missing required field or malformed payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The user already owns the maximum number of profiles.
    #[error("profile limit reached (max {0})")]
    ProfileLimitReached(usize),

    /// Name-based profile resolution matched nothing.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// The embedding provider failed for non-empty text.
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Either persistence layer is unreachable or returned corrupt data.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// An embedding or store call exceeded its bound.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<rusqlite::Error> for ServiceError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        Self::StoreUnavailable(format!("corrupt record: {e}"))
    }
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::ProfileLimitReached(_) => StatusCode::CONFLICT,
            Self::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            Self::EmbeddingUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
