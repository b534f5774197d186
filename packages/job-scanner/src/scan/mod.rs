//! Scan orchestration.
//!
//! - [`Scanner`] resolves the source set, runs one single-source pass per
//!   source under the outer concurrency limit and aggregates the results.
//! - [`source`] holds the single-source pass: fetch, discover, resolve,
//!   deduplicate, then score and persist each new posting under the inner,
//!   per-source limit.

mod orchestrator;
mod source;

use std::sync::Arc;

use crate::traits::{
    agent::{ExtractionAgent, ScoringAgent},
    fetcher::ContentFetcher,
    profile::{InlineProfile, ProfileSource},
    store::ScanStore,
};

pub use orchestrator::{ScanAccepted, ScanHandle, ScanReport, Scanner};

/// Collaborators used by a scan.
///
/// Scoring runs only when a scorer is set and the profile source yields a
/// profile at scan start.
#[derive(Clone)]
pub struct ScanDeps {
    pub store: Arc<dyn ScanStore>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub extractor: Arc<dyn ExtractionAgent>,
    pub scorer: Option<Arc<dyn ScoringAgent>>,
    pub profile: Arc<dyn ProfileSource>,
}

impl ScanDeps {
    /// Dependencies without scoring.
    pub fn new(
        store: Arc<dyn ScanStore>,
        fetcher: Arc<dyn ContentFetcher>,
        extractor: Arc<dyn ExtractionAgent>,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            scorer: None,
            profile: Arc::new(InlineProfile::none()),
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ScoringAgent>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_profile(mut self, profile: Arc<dyn ProfileSource>) -> Self {
        self.profile = profile;
        self
    }
}

/// Combine the global filter with a source's own filter.
///
/// Blank parts are dropped; the rest are joined by a blank line, global
/// first. Returns an empty string when neither is set.
pub fn effective_filter(global: Option<&str>, source: Option<&str>) -> String {
    [global, source]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
