//! Scan orchestrator - fans a refresh out across sources.

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::source::{scan_source, SourceContext};
use super::ScanDeps;
use crate::error::{Result, ScanError};
use crate::status::{ScanStatus, ScanStatusTracker};
use crate::traits::store::GLOBAL_FILTER_KEY;
use crate::types::{config::ScanConfig, report::SourceScanResult, source::Source};

/// Acknowledgement that a scan was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAccepted {
    pub scan_id: Uuid,
    pub sources_total: usize,
}

/// Aggregated outcome of a finished scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// In completion order
    pub results: Vec<SourceScanResult>,
}

impl ScanReport {
    pub fn jobs_added(&self) -> usize {
        self.results.iter().map(|r| r.jobs_added).sum()
    }

    pub fn jobs_skipped(&self) -> usize {
        self.results.iter().map(|r| r.jobs_skipped).sum()
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceScanResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Result for a source id.
    pub fn result_for(&self, source_id: i64) -> Option<&SourceScanResult> {
        self.results.iter().find(|r| r.source_id == source_id)
    }
}

/// Handle to a running scan. Dropping it leaves the scan running.
#[derive(Debug)]
pub struct ScanHandle {
    accepted: ScanAccepted,
    handle: JoinHandle<Result<ScanReport>>,
}

impl ScanHandle {
    pub fn accepted(&self) -> &ScanAccepted {
        &self.accepted
    }

    pub fn scan_id(&self) -> Uuid {
        self.accepted.scan_id
    }

    /// Wait for the scan to finish.
    pub async fn wait(self) -> Result<ScanReport> {
        self.handle
            .await
            .map_err(|e| ScanError::TaskFailed(e.to_string()))?
    }
}

/// Coordinates scans over the configured sources.
///
/// At most one scan runs at a time per tracker; cloning the scanner shares
/// the tracker.
#[derive(Clone)]
pub struct Scanner {
    deps: ScanDeps,
    config: Arc<ScanConfig>,
    tracker: ScanStatusTracker,
}

impl Scanner {
    pub fn new(deps: ScanDeps, config: ScanConfig) -> Self {
        Self {
            deps,
            config: Arc::new(config),
            tracker: ScanStatusTracker::new(),
        }
    }

    /// Use an existing tracker (e.g. one shared with other components).
    pub fn with_tracker(mut self, tracker: ScanStatusTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> &ScanStatusTracker {
        &self.tracker
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Current progress. Safe to call at any time, including mid-scan.
    pub fn get_status(&self) -> ScanStatus {
        self.tracker.snapshot()
    }

    /// Start a scan in the background.
    ///
    /// `source_ids` of `None` or empty scans every configured source.
    /// Rejected with [`ScanError::AlreadyScanning`] while another scan runs
    /// and with [`ScanError::NoSources`] when nothing matches; the latter is
    /// also recorded as the scan-level error in the status.
    pub async fn start_scan(&self, source_ids: Option<&[i64]>) -> Result<ScanHandle> {
        let guard = self.tracker.try_start()?;

        let sources = match self.resolve_sources(source_ids).await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "Scan rejected");
                guard.fail(e.to_string());
                return Err(e);
            }
        };

        let accepted = ScanAccepted {
            scan_id: guard.scan_id(),
            sources_total: sources.len(),
        };

        let scanner = self.clone();
        let handle = tokio::spawn(async move {
            let scan_id = guard.scan_id();
            match AssertUnwindSafe(scanner.execute(scan_id, sources))
                .catch_unwind()
                .await
            {
                Ok(report) => {
                    guard.finish();
                    Ok(report)
                }
                Err(panic) => {
                    let message = format!("scan task panicked: {}", panic_message(&*panic));
                    error!(scan_id = %scan_id, error = %message, "Scan aborted");
                    guard.abort(message.clone());
                    Err(ScanError::TaskFailed(message))
                }
            }
        });

        Ok(ScanHandle { accepted, handle })
    }

    /// Run a scan to completion.
    pub async fn run_scan(&self, source_ids: Option<&[i64]>) -> Result<ScanReport> {
        self.start_scan(source_ids).await?.wait().await
    }

    async fn resolve_sources(&self, source_ids: Option<&[i64]>) -> Result<Vec<Source>> {
        let sources = match source_ids {
            Some(ids) if !ids.is_empty() => self.deps.store.get_sources(ids).await?,
            _ => self.deps.store.list_sources().await?,
        };

        if sources.is_empty() {
            return Err(ScanError::NoSources);
        }
        Ok(sources)
    }

    /// Body of the supervised scan task. The caller owns the scan guard and
    /// finishes the status afterwards, aborting it if this panics.
    async fn execute(self, scan_id: Uuid, sources: Vec<Source>) -> ScanReport {
        let started_at = Utc::now();
        let total = sources.len();

        self.tracker.reset(total);
        self.tracker.set_step("Loading profile");

        let profile = self.load_profile().await;
        let global_filter = self.load_global_filter().await;

        self.tracker.set_step(format!("Scanning {} sources", total));

        info!(
            scan_id = %scan_id,
            sources = total,
            scoring = profile.is_some(),
            max_concurrent_sources = self.config.max_concurrent_sources,
            "Scanning sources"
        );

        let ctx = Arc::new(SourceContext {
            deps: self.deps.clone(),
            config: self.config.clone(),
            tracker: self.tracker.clone(),
            profile,
            global_filter,
        });

        // Outer pool: one permit per concurrently scanned source
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_sources.max(1)));

        let mut pending: FuturesUnordered<_> = sources
            .into_iter()
            .map(|source| {
                let ctx = ctx.clone();
                let semaphore = semaphore.clone();
                let task_source = source.clone();

                let handle = tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return SourceScanResult::failed(&task_source, "source pool closed")
                        }
                    };
                    scan_source(&ctx, &task_source).await
                });

                async move { (source, handle.await) }
            })
            .collect();

        // Fan-in: each task's outcome is captured on its own, siblings keep running
        let mut results = Vec::with_capacity(total);
        while let Some((source, outcome)) = pending.next().await {
            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!(source = %source.name, error = %e, "Source task aborted");
                    SourceScanResult::failed(&source, format!("source task aborted: {}", e))
                }
            };
            self.tracker.append_result(result.clone());
            results.push(result);
        }

        let report = ScanReport {
            scan_id,
            started_at,
            finished_at: Utc::now(),
            results,
        };

        info!(
            scan_id = %scan_id,
            added = report.jobs_added(),
            skipped = report.jobs_skipped(),
            failed_sources = report.failed_sources().count(),
            "Scan complete"
        );

        report
    }

    /// Reference profile for this scan, or `None` to skip scoring.
    async fn load_profile(&self) -> Option<Arc<str>> {
        if self.deps.scorer.is_none() {
            debug!("No scoring agent configured; scoring disabled");
            return None;
        }

        match self.deps.profile.load_profile().await {
            Ok(Some(profile)) => Some(Arc::from(profile)),
            Ok(None) => {
                warn!("No reference profile available; scoring disabled for this scan");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to load reference profile; scoring disabled for this scan");
                None
            }
        }
    }

    /// Stored `global_filter` setting, falling back to the configured one.
    async fn load_global_filter(&self) -> Option<String> {
        match self.deps.store.get_setting(GLOBAL_FILTER_KEY).await {
            Ok(Some(filter)) if !filter.trim().is_empty() => Some(filter),
            Ok(_) => self.config.global_filter.clone(),
            Err(e) => {
                warn!(error = %e, "Failed to load global filter setting; using configured filter");
                self.config.global_filter.clone()
            }
        }
    }
}

/// Message carried by a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
