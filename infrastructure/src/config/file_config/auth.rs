//! Credential source from TOML (`[auth]` section)
//!
//! Either an inline `token` or a `token_file` kept fresh by an external
//! login helper. With `token_poll_secs` the file is polled for rotation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuthConfig {
    pub token: Option<String>,
    pub token_file: Option<String>,
    /// 0 disables polling
    pub token_poll_secs: u64,
}

impl Default for FileAuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_file: None,
            token_poll_secs: 30,
        }
    }
}
