//! In-memory credential provider

use super::usable;
use async_trait::async_trait;
use horo_application::{CredentialError, CredentialProvider};
use horo_domain::Credential;
use tokio::sync::watch;
use tracing::info;

/// Holds one credential in memory. Subscribers see every rotation.
pub struct StaticCredentialProvider {
    current: watch::Sender<Option<Credential>>,
}

impl StaticCredentialProvider {
    pub fn new(credential: Credential) -> Self {
        Self {
            current: watch::Sender::new(Some(credential)),
        }
    }

    /// A provider with no credential yet.
    pub fn empty() -> Self {
        Self {
            current: watch::Sender::new(None),
        }
    }

    /// Replace the credential. Subscribers are only notified when it
    /// actually changes.
    pub fn set(&self, credential: Credential) {
        let changed = self.current.send_if_modified(|current| {
            if current.as_ref() == Some(&credential) {
                return false;
            }
            *current = Some(credential);
            true
        });
        if changed {
            info!("Credential rotated");
        }
    }

    /// Drop the credential (sign-out).
    pub fn clear(&self) {
        self.current.send_if_modified(|current| current.take().is_some());
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn token(&self, _force_refresh: bool) -> Result<Credential, CredentialError> {
        usable(self.current.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.current.subscribe()
    }
}
