//! HTTP error taxonomy for the songs API
//!
//! Domain conditions (missing song, duplicate username, bad credentials) are
//! translated here. Everything else surfaces as `Internal`, logged in full and
//! reported to the client with a generic message.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Realm advertised on every 401
pub const WWW_AUTHENTICATE: &str = "Bearer realm=\"Songs API\"";

const INTERNAL_MESSAGE: &str = "An internal server error occurred. Please try again later.";

/// One schema-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input outside schema validation (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing/invalid/expired token or bad credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Referenced resource absent (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate resource (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Schema-level field errors (422)
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Too many requests for this identifier (429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Unexpected failure (500); the message is logged, never returned
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<songs_common::Error> for ApiError {
    fn from(err: songs_common::Error) -> Self {
        use songs_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::InvalidCredentials => {
                ApiError::Unauthorized("Invalid username or password".to_string())
            }
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => {
                (status, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Unauthorized(msg) => (
                status,
                [(header::WWW_AUTHENTICATE, WWW_AUTHENTICATE)],
                Json(json!({ "error": msg })),
            )
                .into_response(),
            ApiError::Validation(errors) => {
                (status, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::RateLimited => (
                status,
                Json(json!({
                    "error": "Rate limit exceeded",
                    "message": "Too many requests. Please try again later.",
                })),
            )
                .into_response(),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Unhandled error while serving request");
                (status, Json(json!({ "error": INTERNAL_MESSAGE }))).into_response()
            }
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
