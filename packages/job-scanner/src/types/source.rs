//! Sources - configured job-board search pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job-board search page that is periodically scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,

    /// Search results page URL
    pub url: String,

    /// Friendly name, e.g. "LinkedIn - Rust Jobs"
    pub name: String,

    /// Source-specific relevance filter for the extraction agent
    pub filter_description: Option<String>,

    /// Last time a scan got past discovery for this source
    pub last_scanned_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl Source {
    /// Create a source that has never been scanned.
    pub fn new(id: i64, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            name: name.into(),
            filter_description: None,
            last_scanned_at: None,
            created_at: Utc::now(),
        }
    }

    /// Set the source filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_description = Some(filter.into());
        self
    }
}

/// Input for creating a source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSource {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub filter_description: Option<String>,
}

impl NewSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            filter_description: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_description = Some(filter.into());
        self
    }
}
