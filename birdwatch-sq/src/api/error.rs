//! HTTP error responses
//!
//! Every failure leaves the service as `(status, {"error": message})`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed validation
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No caller identity on a route that requires one
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Query or transaction failure
    #[error("Database error: {0}")]
    Database(String),

    /// Anything else that is the service's fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Database(e.to_string())
    }
}

impl From<birdwatch_common::Error> for ApiError {
    fn from(e: birdwatch_common::Error) -> Self {
        use birdwatch_common::Error;

        match e {
            Error::Database(err) => ApiError::Database(err.to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
