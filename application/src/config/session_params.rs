//! Session parameters: who the local user is and how the session behaves.

use crate::config::reconnect::ReconnectPolicy;
use horo_domain::{Role, UserId};

/// Static parameters for a [`SessionOrchestrator`](crate::use_cases::session::SessionOrchestrator).
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// The local user's id; used as `senderId` on outbound text.
    pub user_id: UserId,
    /// The local user's role; drives action gating.
    pub role: Role,
    pub reconnect: ReconnectPolicy,
}

impl SessionParams {
    pub fn new(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}
