//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{JobStore, SettingsStore, SourceStore};
use crate::types::{
    job::{Job, NewJob},
    source::{NewSource, Source},
};

/// In-memory storage for jobs, sources and settings.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryStore {
    /// Keyed by URL, which doubles as the uniqueness constraint
    jobs: RwLock<HashMap<String, Job>>,
    sources: RwLock<BTreeMap<i64, Source>>,
    settings: RwLock<HashMap<String, String>>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            sources: RwLock::new(BTreeMap::new()),
            settings: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Insert a source as-is (keeps its id).
    pub fn insert_source(&self, source: Source) {
        self.next_id.fetch_max(source.id + 1, Ordering::SeqCst);
        write(&self.sources).insert(source.id, source);
    }

    /// Get the number of stored jobs.
    pub fn job_count(&self) -> usize {
        read(&self.jobs).len()
    }

    /// Get a stored job by URL.
    pub fn job_by_url(&self, url: &str) -> Option<Job> {
        read(&self.jobs).get(url).cloned()
    }

    /// Get a source by id.
    pub fn source(&self, id: i64) -> Option<Source> {
        read(&self.sources).get(&id).cloned()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        write(&self.jobs).clear();
        write(&self.sources).clear();
        write(&self.settings).clear();
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn find_by_urls(&self, urls: &[String]) -> StoreResult<Vec<Job>> {
        let jobs = read(&self.jobs);
        Ok(urls.iter().filter_map(|url| jobs.get(url).cloned()).collect())
    }

    async fn insert(&self, job: NewJob) -> StoreResult<Job> {
        let mut jobs = write(&self.jobs);
        if jobs.contains_key(&job.url) {
            return Err(StoreError::DuplicateUrl { url: job.url });
        }

        let job = job.into_job(self.next_id(), Utc::now());
        jobs.insert(job.url.clone(), job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: i64) -> StoreResult<Option<Job>> {
        Ok(read(&self.jobs).values().find(|j| j.id == id).cloned())
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = read(&self.jobs).values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }
}

#[async_trait]
impl SourceStore for MemoryStore {
    async fn list_sources(&self) -> StoreResult<Vec<Source>> {
        Ok(read(&self.sources).values().cloned().collect())
    }

    async fn get_sources(&self, ids: &[i64]) -> StoreResult<Vec<Source>> {
        let sources = read(&self.sources);
        Ok(sources
            .values()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn create_source(&self, source: NewSource) -> StoreResult<Source> {
        let created = Source {
            id: self.next_id(),
            url: source.url,
            name: source.name,
            filter_description: source.filter_description,
            last_scanned_at: None,
            created_at: Utc::now(),
        };
        write(&self.sources).insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_source_scanned(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        match write(&self.sources).get_mut(&id) {
            Some(source) => {
                source.last_scanned_at = Some(at);
                Ok(())
            }
            None => Err(StoreError::SourceNotFound { id }),
        }
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(read(&self.settings).get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        write(&self.settings).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::job::JobStatus;

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::new();
        let job = store
            .insert(NewJob::new("https://b.com/jobs/1", "Acme", "Engineer").with_score(Some(80)))
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Suggested);
        assert_eq!(store.get_job(job.id).await.unwrap(), Some(job.clone()));

        let found = store
            .find_by_urls(&["https://b.com/jobs/1".into(), "https://b.com/jobs/2".into()])
            .await
            .unwrap();
        assert_eq!(found, vec![job]);
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected() {
        let store = MemoryStore::new();
        store.insert(NewJob::new("https://b.com/j", "A", "T")).await.unwrap();

        let err = store
            .insert(NewJob::new("https://b.com/j", "B", "U"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUrl { .. }));
        assert_eq!(store.job_count(), 1);
    }

    #[tokio::test]
    async fn test_sources_and_scan_time() {
        let store = MemoryStore::new();
        let a = store.create_source(NewSource::new("A", "https://a.com")).await.unwrap();
        let b = store
            .create_source(NewSource::new("B", "https://b.com").with_filter("Rust"))
            .await
            .unwrap();

        assert_eq!(store.list_sources().await.unwrap().len(), 2);
        assert_eq!(store.get_sources(&[b.id, 999]).await.unwrap(), vec![b.clone()]);

        let now = Utc::now();
        store.update_source_scanned(a.id, now).await.unwrap();
        assert_eq!(store.source(a.id).unwrap().last_scanned_at, Some(now));

        assert!(matches!(
            store.update_source_scanned(999, now).await,
            Err(StoreError::SourceNotFound { id: 999 })
        ));
    }

    #[tokio::test]
    async fn test_settings() {
        let store = MemoryStore::new();
        assert_eq!(store.get_setting("global_filter").await.unwrap(), None);

        store.set_setting("global_filter", "Remote").await.unwrap();
        assert_eq!(
            store.get_setting("global_filter").await.unwrap().as_deref(),
            Some("Remote")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_keep_one() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert(NewJob::new("https://b.com/same", "Acme", format!("Copy {}", i)))
                    .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.job_count(), 1);
    }
}
