//! Reconnection policy for the streaming connection.
//!
//! The transport itself never retries. After an unexpected close the
//! orchestrator consults [`ReconnectPolicy`] to decide whether (and when) to
//! dial again with the current credential.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do after the stream drops for a reason other than a credential
/// rotation or a local disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Stay disconnected until the credential rotates or the user reselects.
    #[default]
    None,
    /// Exponential backoff: `initial * 2^attempt`, capped at `max`, giving up
    /// after `max_attempts` consecutive failures.
    Backoff {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        max_attempts: u32,
    },
}

impl ReconnectPolicy {
    pub fn backoff(initial: Duration, max: Duration, max_attempts: u32) -> Self {
        ReconnectPolicy::Backoff {
            initial_delay_ms: u64::try_from(initial.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(max.as_millis()).unwrap_or(u64::MAX),
            max_attempts,
        }
    }

    /// Delay before reconnect attempt number `attempt` (0-based), or `None`
    /// when no further attempt should be made.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::None => None,
            ReconnectPolicy::Backoff {
                initial_delay_ms,
                max_delay_ms,
                max_attempts,
            } => {
                if attempt >= max_attempts {
                    return None;
                }
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                let delay = initial_delay_ms.saturating_mul(factor).min(max_delay_ms);
                Some(Duration::from_millis(delay))
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, ReconnectPolicy::None)
    }
}
