//! Persisted job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Discovered by a scan and surfaced to the user
    Suggested,
    Processing,
    Applied,
    Rejected,
    Offer,
    /// Not surfaced (user dismissed it, or it scored below the threshold)
    Dismissed,
    /// Processing failed; see `error_message`
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggested => "suggested",
            Self::Processing => "processing",
            Self::Applied => "applied",
            Self::Rejected => "rejected",
            Self::Offer => "offer",
            Self::Dismissed => "dismissed",
            Self::Failed => "failed",
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Suggested
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suggested" => Ok(Self::Suggested),
            "processing" => Ok(Self::Processing),
            "applied" => Ok(Self::Applied),
            "rejected" => Ok(Self::Rejected),
            "offer" => Ok(Self::Offer),
            "dismissed" => Ok(Self::Dismissed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// A persisted job. `url` is the unique dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub url: String,
    pub company: String,
    pub title: String,
    pub status: JobStatus,

    /// Match score 0-100, if scored
    pub score: Option<u8>,

    pub source_id: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub url: String,
    pub company: String,
    pub title: String,
    pub status: JobStatus,
    pub score: Option<u8>,
    pub source_id: Option<i64>,
    pub error_message: Option<String>,
}

impl NewJob {
    /// Create a suggested job.
    pub fn new(
        url: impl Into<String>,
        company: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            company: company.into(),
            title: title.into(),
            status: JobStatus::Suggested,
            score: None,
            source_id: None,
            error_message: None,
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_score(mut self, score: Option<u8>) -> Self {
        self.score = score;
        self
    }

    pub fn with_source(mut self, source_id: i64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Materialize into a stored job.
    pub fn into_job(self, id: i64, created_at: DateTime<Utc>) -> Job {
        Job {
            id,
            url: self.url,
            company: self.company,
            title: self.title,
            status: self.status,
            score: self.score,
            source_id: self.source_id,
            error_message: self.error_message,
            created_at,
        }
    }
}
