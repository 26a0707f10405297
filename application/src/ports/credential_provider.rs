//! Credential provider port
//!
//! Supplies the bearer credential and announces rotation.

use async_trait::async_trait;
use horo_domain::Credential;
use thiserror::Error;
use tokio::sync::watch;

/// Errors that can occur while obtaining a credential
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No credential available")]
    Unavailable,

    #[error("Credential expired")]
    Expired,

    #[error("Failed to read credential: {0}")]
    Read(String),
}

/// Source of the bearer credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The current credential. With `force_refresh` the provider should
    /// re-read its source instead of returning a cached value (used after a
    /// 401).
    async fn token(&self, force_refresh: bool) -> Result<Credential, CredentialError>;

    /// Observe rotations. The receiver yields the latest credential (or
    /// `None` once signed out) each time it changes.
    fn subscribe(&self) -> watch::Receiver<Option<Credential>>;
}
