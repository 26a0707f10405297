//! Error types for the REST adapter

use horo_application::{ApiError, CredentialError};
use thiserror::Error;

/// Result type alias for REST operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// Errors that can occur talking to the REST collaborators
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    Unexpected(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl From<HttpError> for ApiError {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Request(e) if e.is_timeout() => ApiError::Timeout,
            HttpError::Request(e) => ApiError::ConnectionError(e.to_string()),
            HttpError::InvalidBaseUrl(url) => ApiError::ConnectionError(url),
            HttpError::Unauthorized => ApiError::Unauthorized,
            HttpError::NotFound(path) => ApiError::NotFound(path),
            HttpError::Status { status, message } => ApiError::Status { status, message },
            HttpError::Decode(e) => ApiError::InvalidResponse(e.to_string()),
            HttpError::Unexpected(message) => ApiError::InvalidResponse(message),
            HttpError::Credential(e) => ApiError::Credential(e.to_string()),
        }
    }
}
