//! Stream reconnection from TOML (`[reconnect]` section)
//!
//! ```toml
//! [reconnect]
//! policy = "backoff"      # or "none" (default)
//! initial_delay_ms = 500
//! max_delay_ms = 30000
//! max_attempts = 8
//! ```

use horo_application::ReconnectPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReconnectConfig {
    pub policy: String,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for FileReconnectConfig {
    fn default() -> Self {
        Self {
            policy: "none".to_string(),
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: 8,
        }
    }
}

impl FileReconnectConfig {
    /// Convert to a [`ReconnectPolicy`]. `None` for an unknown policy name.
    pub fn to_policy(&self) -> Option<ReconnectPolicy> {
        match self.policy.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Some(ReconnectPolicy::None),
            "backoff" => Some(ReconnectPolicy::Backoff {
                initial_delay_ms: self.initial_delay_ms,
                max_delay_ms: self.max_delay_ms,
                max_attempts: self.max_attempts,
            }),
            _ => None,
        }
    }
}
