//! Participant role value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which side of a room the local user is on.
///
/// The role comes from the `role` claim on the user's credential; every
/// action the order panel offers is gated on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The requester who buys the course and pays for the order.
    #[default]
    Customer,
    /// The service provider who delivers the session.
    Prophet,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Prophet => "prophet",
        }
    }

    /// The role on the other side of the room.
    pub fn counterpart(&self) -> Role {
        match self {
            Role::Customer => Role::Prophet,
            Role::Prophet => Role::Customer,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "prophet" => Ok(Role::Prophet),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}
