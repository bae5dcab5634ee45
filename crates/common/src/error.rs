use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failure of a single JSON-RPC exchange with Kodi.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Network-level failure: DNS, connect, TLS, timeout or body read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Kodi answered with something other than `200 OK`.
    #[error("Unexpected status: {0}")]
    Status(String),
}

/// Common error types used across the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Kodi notifications are disabled")]
    Disabled,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Disabled => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
