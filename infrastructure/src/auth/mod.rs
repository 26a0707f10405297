//! Credential providers
//!
//! - [`StaticCredentialProvider`]: a token supplied on the command line or in
//!   config; rotated by calling [`set`](StaticCredentialProvider::set).
//! - [`TokenFileProvider`]: a token kept in a file by an external login
//!   helper, re-read on demand and polled for changes.

pub mod static_provider;
pub mod token_file;

pub use static_provider::StaticCredentialProvider;
pub use token_file::TokenFileProvider;

use chrono::Utc;
use horo_application::CredentialError;
use horo_domain::Credential;

/// Check that `credential` is present and usable right now.
fn usable(credential: Option<Credential>) -> Result<Credential, CredentialError> {
    match credential {
        Some(c) if c.is_empty() => Err(CredentialError::Unavailable),
        Some(c) if c.is_expired(Utc::now()) => Err(CredentialError::Expired),
        Some(c) => Ok(c),
        None => Err(CredentialError::Unavailable),
    }
}
