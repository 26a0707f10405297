//! Credential read from a token file.
//!
//! An external login helper keeps the file up to date. The provider re-reads
//! it when asked to refresh (after a 401) and, optionally, polls it so that a
//! rotated token reaches the session without waiting for a failure.

use super::usable;
use async_trait::async_trait;
use horo_application::{CredentialError, CredentialProvider};
use horo_domain::Credential;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct TokenFileProvider {
    path: PathBuf,
    current: watch::Sender<Option<Credential>>,
}

impl TokenFileProvider {
    /// Read the token at `path`. A missing or empty file is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let credential = read_token(&path).await?.ok_or(CredentialError::Unavailable)?;
        debug!(
            "Loaded credential {} from {}",
            credential.redacted(),
            path.display()
        );
        Ok(Self {
            path,
            current: watch::Sender::new(Some(credential)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file. Returns whether the credential changed.
    ///
    /// An empty file clears the credential.
    pub async fn reload(&self) -> Result<bool, CredentialError> {
        let credential = read_token(&self.path).await?;
        let changed = self.current.send_if_modified(|current| {
            if *current == credential {
                return false;
            }
            *current = credential;
            true
        });
        if changed {
            info!("Credential in {} changed", self.path.display());
        }
        Ok(changed)
    }

    /// Poll the file every `every` until `cancel` fires.
    pub fn spawn_watcher(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(every);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; the file was just read.
            ticks.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => {
                        if let Err(e) = provider.reload().await {
                            warn!("Failed to re-read {}: {}", provider.path.display(), e);
                        }
                    }
                }
            }
            debug!("Stopped watching {}", provider.path.display());
        })
    }
}

async fn read_token(path: &Path) -> Result<Option<Credential>, CredentialError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CredentialError::Read(format!("{}: {}", path.display(), e)))?;
    let credential = Credential::new(raw);
    Ok((!credential.is_empty()).then_some(credential))
}

#[async_trait]
impl CredentialProvider for TokenFileProvider {
    async fn token(&self, force_refresh: bool) -> Result<Credential, CredentialError> {
        if force_refresh {
            self.reload().await?;
        }
        usable(self.current.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn token_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[tokio::test]
    async fn test_open_trims_token() {
        let file = token_file("  abc123\n");
        let provider = TokenFileProvider::open(file.path()).await.unwrap();
        assert_eq!(provider.token(false).await.unwrap().token(), "abc123");
    }

    #[tokio::test]
    async fn test_open_rejects_missing_or_empty() {
        let empty = token_file("\n");
        assert_eq!(
            TokenFileProvider::open(empty.path()).await.err(),
            Some(CredentialError::Unavailable)
        );
        assert!(matches!(
            TokenFileProvider::open("/nonexistent/horo/token").await,
            Err(CredentialError::Read(_))
        ));
    }

    #[tokio::test]
    async fn test_forced_refresh_rereads_file() {
        let file = token_file("first");
        let provider = TokenFileProvider::open(file.path()).await.unwrap();
        let changes = provider.subscribe();

        std::fs::write(file.path(), "second").unwrap();
        assert_eq!(provider.token(false).await.unwrap().token(), "first");
        assert_eq!(provider.token(true).await.unwrap().token(), "second");
        assert!(changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_reload_reports_changes_only() {
        let file = token_file("same");
        let provider = TokenFileProvider::open(file.path()).await.unwrap();
        assert!(!provider.reload().await.unwrap());

        std::fs::write(file.path(), "").unwrap();
        assert!(provider.reload().await.unwrap());
        assert_eq!(
            provider.token(false).await.unwrap_err(),
            CredentialError::Unavailable
        );
    }

    #[tokio::test]
    async fn test_watcher_picks_up_rotation() {
        let file = token_file("a");
        let provider = Arc::new(TokenFileProvider::open(file.path()).await.unwrap());
        let mut changes = provider.subscribe();
        let cancel = CancellationToken::new();
        let watcher = provider.spawn_watcher(Duration::from_millis(10), cancel.clone());

        std::fs::write(file.path(), "b").unwrap();
        tokio::time::timeout(Duration::from_secs(2), changes.changed())
            .await
            .expect("watcher did not notice the new token")
            .unwrap();
        assert_eq!(
            changes.borrow().as_ref().map(|c| c.token().to_string()),
            Some("b".to_string())
        );

        cancel.cancel();
        watcher.await.unwrap();
    }
}
