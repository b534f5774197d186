//! Storage traits for jobs, sources and settings.
//!
//! The storage layer is split into focused traits:
//! - `JobStore`: Discovered jobs, unique by URL
//! - `SourceStore`: Configured sources and their scan timestamps
//! - `SettingsStore`: Key-value application settings
//! - `ScanStore`: Composite trait combining all three

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::types::{
    job::{Job, NewJob},
    source::{NewSource, Source},
};

/// Settings key holding the filter applied to every source.
pub const GLOBAL_FILTER_KEY: &str = "global_filter";

/// Persistence for discovered jobs.
///
/// Implementations must enforce uniqueness on `url`: `insert` fails with
/// [`StoreError::DuplicateUrl`](crate::StoreError::DuplicateUrl) when a job
/// with the same URL exists, even under concurrent inserts.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Existing jobs whose URL is in `urls`, in one query.
    async fn find_by_urls(&self, urls: &[String]) -> StoreResult<Vec<Job>>;

    /// Existing job with this URL.
    async fn find_by_url(&self, url: &str) -> StoreResult<Option<Job>> {
        Ok(self
            .find_by_urls(&[url.to_string()])
            .await?
            .into_iter()
            .next())
    }

    /// Insert a job.
    async fn insert(&self, job: NewJob) -> StoreResult<Job>;

    /// Get a job by id.
    async fn get_job(&self, id: i64) -> StoreResult<Option<Job>>;

    /// All jobs, newest first.
    async fn list_jobs(&self) -> StoreResult<Vec<Job>>;
}

/// Persistence for sources.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// All configured sources, ordered by id.
    async fn list_sources(&self) -> StoreResult<Vec<Source>>;

    /// Sources with the given ids, ordered by id. Unknown ids are ignored.
    async fn get_sources(&self, ids: &[i64]) -> StoreResult<Vec<Source>>;

    async fn create_source(&self, source: NewSource) -> StoreResult<Source>;

    /// Record the time of a scan attempt that got past discovery.
    async fn update_source_scanned(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()>;
}

/// Key-value settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// Composite storage trait used by the scanner.
pub trait ScanStore: JobStore + SourceStore + SettingsStore {}

// Blanket implementation: anything implementing all three traits is a ScanStore
impl<T: JobStore + SourceStore + SettingsStore> ScanStore for T {}
