//! Participant identity from TOML (`[session]` section)

use horo_domain::Role;
use serde::{Deserialize, Serialize};

/// Raw session configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    /// "customer" or "prophet"
    pub role: Option<String>,
    /// The local participant's user id
    pub user_id: Option<String>,
    /// Name shown on submitted reviews
    pub display_name: Option<String>,
}

impl FileSessionConfig {
    /// Parse the role string. `None` when unset or unrecognised.
    pub fn parse_role(&self) -> Option<Role> {
        self.role.as_ref().and_then(|s| s.parse().ok())
    }
}
