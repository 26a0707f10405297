//! Infrastructure layer for horo
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod api;
pub mod auth;
pub mod config;
pub mod stream;

// Re-export commonly used types
pub use api::{HttpApiClient, HttpError};
pub use auth::{StaticCredentialProvider, TokenFileProvider};
pub use config::{
    ConfigLoader, ConfigValidationError, FileAuthConfig, FileConfig, FileLoggingConfig,
    FileReconnectConfig, FileServerConfig, FileSessionConfig,
};
pub use stream::{StreamError, WebSocketTransport};
