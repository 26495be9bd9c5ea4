use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Handler failure, rendered as `{"error": "..."}` with the matching status.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl SandboxError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        SandboxError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        SandboxError::Unauthorized(message.into())
    }

    pub fn forbidden() -> Self {
        SandboxError::Forbidden("Access denied".to_string())
    }

    pub fn not_found(what: &str) -> Self {
        SandboxError::NotFound(format!("{} not found", what))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SandboxError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SandboxError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SandboxError::Forbidden(_) => StatusCode::FORBIDDEN,
            SandboxError::NotFound(_) => StatusCode::NOT_FOUND,
            SandboxError::Conflict(_) => StatusCode::CONFLICT,
            SandboxError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SandboxError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Sandbox handler failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type SandboxResult<T> = Result<T, SandboxError>;
