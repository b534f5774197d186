//! Agent traits for discovery and scoring.
//!
//! Agent calls are typically LLM-backed and take seconds. Implementations
//! that block a thread must move the work onto `spawn_blocking` themselves;
//! the scanner additionally runs extraction on its own task so a slow agent
//! never holds up other sources.

use async_trait::async_trait;

use crate::error::{ExtractionResult, ScoringResult};
use crate::types::posting::{DiscoveredPosting, JobScore};

/// Finds job postings in a source page.
#[async_trait]
pub trait ExtractionAgent: Send + Sync {
    /// Extract candidate postings from page content.
    ///
    /// `filter` describes which postings are relevant. An empty filter means
    /// every posting on the page.
    async fn extract(&self, content: &str, filter: &str) -> ExtractionResult<Vec<DiscoveredPosting>>;
}

/// Rates how well a posting matches a reference profile.
#[async_trait]
pub trait ScoringAgent: Send + Sync {
    async fn score(&self, posting_text: &str, profile: &str) -> ScoringResult<JobScore>;
}
