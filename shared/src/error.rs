//! Error types shared by the client, the session store and the view models.
//!
//! The server only ever hands back an HTTP status and an optional JSON body
//! carrying an `error` (or `message`) string, so errors are not classified
//! further than that.

use serde_json::Value;
use thiserror::Error;

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";
pub const NO_RESPONSE_MESSAGE: &str = "No response from server. Please check your connection.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("No response from server. Please check your connection.")]
    Network(#[source] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Build an HTTP error from a status and whatever body the server sent.
    pub fn from_status(status: u16, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(|b| string_field(b, "error").or_else(|| string_field(b, "message")))
            .unwrap_or(GENERIC_ERROR_MESSAGE)
            .to_string();
        ApiError::Http {
            status,
            message,
            body,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// User-facing message, suitable for an inline alert.
    pub fn message(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// The server's own `error` string, when it sent one.
    pub fn server_error(&self) -> Option<&str> {
        match self {
            ApiError::Http { body: Some(body), .. } => string_field(body, "error"),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err)
        }
    }
}

fn string_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Failure of a session action. Carries one message, like the web store did.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
    pub status: Option<u16>,
}

impl AuthError {
    /// Prefer the server's `error` string, otherwise fall back to `fallback`.
    pub fn from_api(err: &ApiError, fallback: &str) -> Self {
        AuthError {
            message: err.server_error().unwrap_or(fallback).to_string(),
            status: err.status(),
        }
    }

    pub fn new(message: impl Into<String>) -> Self {
        AuthError {
            message: message.into(),
            status: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed session file: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Could not determine the home directory; set SESSION_FILE")]
    NoHomeDir,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("page size must be greater than zero")]
    ZeroPageSize,
}
