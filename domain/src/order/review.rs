//! Course review submitted after a completed session

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// A validated review. Construct through [`Review::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    score: u8,
    title: String,
    description: String,
}

impl Review {
    pub fn new(
        score: u8,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(DomainError::InvalidReviewScore(score));
        }
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(DomainError::MissingField("title"));
        }
        Ok(Self {
            score,
            title,
            description: description.into().trim().to_string(),
        })
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}
