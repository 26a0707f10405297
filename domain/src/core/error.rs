//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown order status: {0}")]
    UnknownOrderStatus(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Unknown trigger: {0}")]
    UnknownTrigger(String),

    #[error("Review score must be between 1 and 5, got {0}")]
    InvalidReviewScore(u8),

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

impl DomainError {
    /// Whether this error came from an unrecognised wire discriminant
    /// (status, role or trigger string) rather than from missing data.
    pub fn is_unknown_discriminant(&self) -> bool {
        matches!(
            self,
            DomainError::UnknownOrderStatus(_)
                | DomainError::UnknownRole(_)
                | DomainError::UnknownTrigger(_)
        )
    }
}
