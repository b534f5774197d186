//! Agent outputs: discovered postings and match scores.

use serde::{Deserialize, Serialize};

use crate::error::{ScoringError, ScoringResult};

/// A job listing found on a source page by the extraction agent.
///
/// `url` may be relative to the source page and must be resolved before it
/// is used for dedup or persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPosting {
    pub title: String,
    pub company: String,
    pub url: String,
}

impl DiscoveredPosting {
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            url: url.into(),
        }
    }

    /// Same posting with its URL replaced by the resolved absolute URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Match score for a posting against the reference profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobScore {
    /// 0-100
    pub score: u8,
    pub reasoning: String,
}

impl JobScore {
    /// Build a score, rejecting values outside 0..=100.
    pub fn new(score: i64, reasoning: impl Into<String>) -> ScoringResult<Self> {
        if !(0..=100).contains(&score) {
            return Err(ScoringError::OutOfRange(score));
        }
        Ok(Self {
            score: score as u8,
            reasoning: reasoning.into(),
        })
    }
}
