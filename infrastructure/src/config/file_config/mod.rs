//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; string fields that name domain values are
//! parsed by helper methods.

mod auth;
mod logging;
mod reconnect;
mod server;
mod session;

pub use auth::FileAuthConfig;
pub use logging::FileLoggingConfig;
pub use reconnect::FileReconnectConfig;
pub use server::FileServerConfig;
pub use session::FileSessionConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("server.{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("server.{field} must use one of {expected}, got {scheme}")]
    WrongScheme {
        field: &'static str,
        expected: &'static str,
        scheme: String,
    },

    #[error("server.request_timeout_secs cannot be 0")]
    InvalidTimeout,

    #[error("session.role must be \"customer\" or \"prophet\", got {0:?}")]
    InvalidRole(String),

    #[error("reconnect.policy must be \"none\" or \"backoff\", got {0:?}")]
    InvalidReconnectPolicy(String),

    #[error("reconnect.max_delay_ms ({max}) is below initial_delay_ms ({initial})")]
    InvalidBackoff { initial: u64, max: u64 },

    #[error("auth.token and auth.token_file are mutually exclusive")]
    ConflictingCredentials,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Collaborator endpoints
    pub server: FileServerConfig,
    /// Local participant
    pub session: FileSessionConfig,
    /// Credential source
    pub auth: FileAuthConfig,
    /// Stream reconnection
    pub reconnect: FileReconnectConfig,
    /// Log files
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        check_url("api_base_url", &self.server.api_base_url, &["http", "https"], "http/https")?;
        check_url("ws_url", &self.server.ws_url, &["ws", "wss"], "ws/wss")?;

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        if let Some(role) = &self.session.role
            && self.session.parse_role().is_none()
        {
            return Err(ConfigValidationError::InvalidRole(role.clone()));
        }

        if self.reconnect.to_policy().is_none() {
            return Err(ConfigValidationError::InvalidReconnectPolicy(
                self.reconnect.policy.clone(),
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return Err(ConfigValidationError::InvalidBackoff {
                initial: self.reconnect.initial_delay_ms,
                max: self.reconnect.max_delay_ms,
            });
        }

        if self.auth.token.is_some() && self.auth.token_file.is_some() {
            return Err(ConfigValidationError::ConflictingCredentials);
        }

        Ok(())
    }
}

fn check_url(
    field: &'static str,
    value: &str,
    schemes: &[&str],
    expected: &'static str,
) -> Result<(), ConfigValidationError> {
    let url = Url::parse(value).map_err(|_| ConfigValidationError::InvalidUrl {
        field,
        value: value.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigValidationError::WrongScheme {
            field,
            expected,
            scheme: url.scheme().to_string(),
        });
    }
    Ok(())
}
