//! Per-source scan reports.

use serde::{Deserialize, Serialize};

use crate::types::{job::Job, posting::DiscoveredPosting, source::Source};

/// Why a discovered posting was not surfaced as a new suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A job with the same URL is already stored
    AlreadyExists,

    /// Scored below the threshold (still persisted)
    LowScore,

    /// The posting could not be processed: scoring was mandatory and failed,
    /// or the job could not be stored
    ScrapeFailed,
}

/// Summary of one posting in a source report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub title: String,
    pub company: String,
    pub url: String,
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl JobSummary {
    /// Summary of a newly added posting.
    pub fn added(posting: &DiscoveredPosting, score: Option<u8>) -> Self {
        Self {
            title: posting.title.clone(),
            company: posting.company.clone(),
            url: posting.url.clone(),
            score,
            skip_reason: None,
        }
    }

    /// Summary of a skipped posting.
    pub fn skipped(posting: &DiscoveredPosting, score: Option<u8>, reason: SkipReason) -> Self {
        Self {
            skip_reason: Some(reason),
            ..Self::added(posting, score)
        }
    }

    /// Summary of a posting that matched an existing job.
    pub fn existing(posting: &DiscoveredPosting, job: &Job) -> Self {
        Self::skipped(posting, job.score, SkipReason::AlreadyExists)
    }
}

/// Outcome of scanning one source. Built once and never mutated after the
/// source finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceScanResult {
    pub source_id: i64,
    pub source_name: String,
    pub source_url: String,
    pub jobs_found: usize,
    pub jobs_added: usize,
    pub jobs_skipped: usize,
    pub added: Vec<JobSummary>,
    pub skipped: Vec<JobSummary>,
    pub error: Option<String>,
}

impl SourceScanResult {
    /// Empty result for a source.
    pub fn new(source: &Source) -> Self {
        Self {
            source_id: source.id,
            source_name: source.name.clone(),
            source_url: source.url.clone(),
            jobs_found: 0,
            jobs_added: 0,
            jobs_skipped: 0,
            added: Vec::new(),
            skipped: Vec::new(),
            error: None,
        }
    }

    /// Result for a source whose pass failed outright.
    pub fn failed(source: &Source, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(source)
        }
    }

    pub fn push_added(&mut self, summary: JobSummary) {
        self.added.push(summary);
        self.jobs_added = self.added.len();
    }

    pub fn push_skipped(&mut self, summary: JobSummary) {
        self.skipped.push(summary);
        self.jobs_skipped = self.skipped.len();
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
