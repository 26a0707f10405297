//! Collaborator endpoints from TOML (`[server]` section)

use serde::{Deserialize, Serialize};

/// Raw server configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    /// REST base URL, including any path prefix (e.g. `/api`)
    pub api_base_url: String,
    /// Streaming endpoint (`ws://` or `wss://`)
    pub ws_url: String,
    /// Per-request timeout for REST calls
    pub request_timeout_secs: u64,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            ws_url: "ws://localhost:8080/ws/chat".to_string(),
            request_timeout_secs: 30,
        }
    }
}
