//! Scan configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of sources scanned at once.
pub const DEFAULT_MAX_CONCURRENT_SOURCES: usize = 3;

/// Default number of postings fetched/scored at once within one source.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 5;

/// Default delay before each per-job task starts.
pub const DEFAULT_JOB_START_DELAY_MS: u64 = 500;

/// Postings scoring below this are reported as `low_score`.
pub const DEFAULT_LOW_SCORE_THRESHOLD: u8 = 50;

/// Configuration for scan orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Outer pool: sources scanned concurrently.
    pub max_concurrent_sources: usize,

    /// Inner pool, built fresh per source: postings processed concurrently.
    pub max_concurrent_jobs: usize,

    /// Delay inserted before each per-job task starts (milliseconds).
    ///
    /// Spaces out requests to the fetcher and upstream job boards.
    pub job_start_delay_ms: u64,

    /// Scores strictly below this are classified `low_score`.
    pub low_score_threshold: u8,

    /// Treat a posting that cannot be scored as `scrape_failed`.
    ///
    /// Only applies when scoring is available for the run (profile and
    /// scorer present). Default: false, unscored postings are added.
    pub require_score: bool,

    /// Filter applied to every source, combined with the source's own.
    ///
    /// The `global_filter` setting in the store takes precedence.
    pub global_filter: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: DEFAULT_MAX_CONCURRENT_SOURCES,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            job_start_delay_ms: DEFAULT_JOB_START_DELAY_MS,
            low_score_threshold: DEFAULT_LOW_SCORE_THRESHOLD,
            require_score: false,
            global_filter: None,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outer (per-scan) concurrency limit. Clamped to at least 1.
    pub fn with_max_concurrent_sources(mut self, max: usize) -> Self {
        self.max_concurrent_sources = max.max(1);
        self
    }

    /// Set the inner (per-source) concurrency limit. Clamped to at least 1.
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    /// Set the delay before each per-job task starts. Saturates at
    /// `u64::MAX` milliseconds.
    pub fn with_job_start_delay(mut self, delay: Duration) -> Self {
        self.job_start_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_low_score_threshold(mut self, threshold: u8) -> Self {
        self.low_score_threshold = threshold;
        self
    }

    pub fn require_score(mut self, required: bool) -> Self {
        self.require_score = required;
        self
    }

    pub fn with_global_filter(mut self, filter: impl Into<String>) -> Self {
        self.global_filter = Some(filter.into());
        self
    }

    pub fn job_start_delay(&self) -> Duration {
        Duration::from_millis(self.job_start_delay_ms)
    }

    /// True when a score falls below the low-score threshold.
    pub fn is_low_score(&self, score: u8) -> bool {
        score < self.low_score_threshold
    }
}
