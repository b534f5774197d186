//! Process-wide scan progress.
//!
//! A single [`ScanStatus`] lives behind a mutex inside [`ScanStatusTracker`].
//! Source tasks mutate it concurrently through the tracker's operations;
//! pollers read consistent copies through [`ScanStatusTracker::snapshot`].
//! Every critical section is a handful of field updates, so no operation
//! blocks for long and none awaits while holding the lock.
//!
//! Two guards tie cleanup to scope:
//! - [`ScanGuard`] calls `finish()` when dropped, so a scan is never left
//!   "in progress" after an error or panic.
//! - [`SourceGuard`] calls `end_source()` when dropped, so a source is always
//!   removed from the active set and counted as completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ScanError;
use crate::types::report::SourceScanResult;

/// Snapshot of scan progress.
///
/// `version` increases with every mutation, so pollers can tell whether
/// anything changed between two reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub scan_id: Option<Uuid>,
    pub version: u64,
    pub is_scanning: bool,
    pub active_sources: BTreeSet<String>,
    pub sources_total: usize,
    pub sources_completed: usize,
    pub jobs_found: usize,
    pub jobs_scored: usize,
    pub current_step: String,
    pub error: Option<String>,

    /// In completion order, not request order
    pub source_results: Vec<SourceScanResult>,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanStatus {
    /// Fresh status for a newly claimed scan.
    fn started(scan_id: Uuid, version: u64) -> Self {
        Self {
            scan_id: Some(scan_id),
            version,
            is_scanning: true,
            current_step: "Resolving sources".to_string(),
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// Thread-safe owner of the live [`ScanStatus`].
///
/// Cloning is cheap and every clone observes the same status.
#[derive(Debug, Clone, Default)]
pub struct ScanStatusTracker {
    inner: Arc<Mutex<ScanStatus>>,
}

impl ScanStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScanStatus> {
        // A panic inside a critical section cannot leave the status torn: every
        // section is plain field assignment.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(&self, f: impl FnOnce(&mut ScanStatus) -> R) -> R {
        let mut status = self.lock();
        let out = f(&mut status);
        status.version += 1;
        out
    }

    /// Claim the tracker for a new scan.
    ///
    /// Non-blocking check-and-set: fails with [`ScanError::AlreadyScanning`]
    /// while another scan is live, otherwise replaces the status with a fresh
    /// one and returns the guard that will finish it.
    pub fn try_start(&self) -> Result<ScanGuard, ScanError> {
        let scan_id = Uuid::new_v4();
        {
            let mut status = self.lock();
            if status.is_scanning {
                return Err(ScanError::AlreadyScanning);
            }
            let version = status.version + 1;
            *status = ScanStatus::started(scan_id, version);
        }
        info!(scan_id = %scan_id, "Scan started");
        Ok(ScanGuard {
            tracker: self.clone(),
            scan_id,
        })
    }

    /// Reset progress for a scan over `expected_source_count` sources.
    ///
    /// Keeps the scan identity and start time; zeroes counters, clears
    /// active sources, results and error.
    pub fn reset(&self, expected_source_count: usize) {
        self.update(|status| {
            status.is_scanning = true;
            status.active_sources.clear();
            status.sources_total = expected_source_count;
            status.sources_completed = 0;
            status.jobs_found = 0;
            status.jobs_scored = 0;
            status.error = None;
            status.source_results.clear();
            status.finished_at = None;
            status.current_step = format!("Scanning {} sources", expected_source_count);
        });
    }

    /// Mark a source active. The returned guard ends it on drop.
    pub fn begin_source(&self, name: &str) -> SourceGuard {
        self.update(|status| {
            status.active_sources.insert(name.to_string());
            status.current_step = format!("Scanning {}", name);
        });
        debug!(source = %name, "Source active");
        SourceGuard {
            tracker: self.clone(),
            name: name.to_string(),
        }
    }

    /// Mark a source inactive and count it as completed.
    pub fn end_source(&self, name: &str) {
        self.update(|status| {
            status.active_sources.remove(name);
            status.sources_completed += 1;
        });
        debug!(source = %name, "Source finished");
    }

    pub fn record_jobs_found(&self, n: usize) {
        self.update(|status| status.jobs_found += n);
    }

    pub fn record_job_scored(&self) {
        self.update(|status| status.jobs_scored += 1);
    }

    pub fn append_result(&self, result: SourceScanResult) {
        self.update(|status| status.source_results.push(result));
    }

    pub fn set_step(&self, step: impl Into<String>) {
        let step = step.into();
        self.update(|status| status.current_step = step);
    }

    /// Record a scan-level error.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|status| status.error = Some(message));
    }

    /// Record a scan-level error for a scan cut short. Sources that never
    /// reported are counted as completed and nothing stays active.
    pub fn abandon(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|status| {
            status.error = Some(message);
            status.active_sources.clear();
            status.sources_completed = status.sources_completed.max(status.sources_total);
        });
    }

    /// Consistent copy of the current status.
    pub fn snapshot(&self) -> ScanStatus {
        self.lock().clone()
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().is_scanning
    }

    /// Freeze the status. Idempotent: only the first call after a start has
    /// any effect.
    pub fn finish(&self) {
        let finished = self.update(|status| {
            if !status.is_scanning {
                return None;
            }
            status.is_scanning = false;
            status.active_sources.clear();
            status.finished_at = Some(Utc::now());
            status.current_step = if status.error.is_some() {
                "Failed".to_string()
            } else {
                "Complete".to_string()
            };
            Some((status.sources_completed, status.sources_total))
        });

        if let Some((completed, total)) = finished {
            info!(completed, total, "Scan finished");
        }
    }
}

/// Owns a claimed scan; finishes it when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard finishes the scan immediately"]
pub struct ScanGuard {
    tracker: ScanStatusTracker,
    scan_id: Uuid,
}

impl ScanGuard {
    pub fn scan_id(&self) -> Uuid {
        self.scan_id
    }

    pub fn tracker(&self) -> &ScanStatusTracker {
        &self.tracker
    }

    /// Record a scan-level error and finish.
    pub fn fail(self, message: impl Into<String>) {
        self.tracker.set_error(message);
    }

    /// Record the scan as cut short by an unexpected failure and finish.
    pub fn abort(self, message: impl Into<String>) {
        self.tracker.abandon(message);
    }

    /// Finish explicitly.
    pub fn finish(self) {}
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.tracker.finish();
    }
}

/// Marks one source active; ends it when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard ends the source immediately"]
pub struct SourceGuard {
    tracker: ScanStatusTracker,
    name: String,
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.tracker.end_source(&self.name);
    }
}
