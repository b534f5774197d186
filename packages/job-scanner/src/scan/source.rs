//! Single-source pass.
//!
//! 1. Fetch the source page as structured content
//! 2. Extract postings with the combined filter (on its own task)
//! 3. Resolve URLs and drop in-batch duplicates
//! 4. Split off postings whose URL is already stored (one batched lookup)
//! 5. Score and persist each new posting under the per-source job limit
//! 6. Stamp the source's `last_scanned_at`
//!
//! Nothing in here returns an error to the orchestrator: every failure ends
//! up in the source's [`SourceScanResult`] or in the logs.

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::{effective_filter, ScanDeps};
use crate::error::{ExtractionError, FetchError, StoreError};
use crate::resolver::resolve;
use crate::status::ScanStatusTracker;
use crate::traits::{
    agent::ScoringAgent,
    fetcher::{ContentFetcher, ContentFormat},
};
use crate::types::{
    config::ScanConfig,
    job::{Job, JobStatus, NewJob},
    posting::{DiscoveredPosting, JobScore},
    report::{JobSummary, SkipReason, SourceScanResult},
    source::Source,
};

/// State shared by every source task of one scan.
pub(crate) struct SourceContext {
    pub deps: ScanDeps,
    pub config: Arc<ScanConfig>,
    pub tracker: ScanStatusTracker,

    /// Loaded once per scan; `None` disables scoring
    pub profile: Option<Arc<str>>,
    pub global_filter: Option<String>,
}

impl SourceContext {
    fn scoring(&self) -> Option<(Arc<dyn ScoringAgent>, Arc<str>)> {
        match (&self.deps.scorer, &self.profile) {
            (Some(scorer), Some(profile)) => Some((scorer.clone(), profile.clone())),
            _ => None,
        }
    }
}

/// Failures that end a source pass early.
#[derive(Debug, Error)]
enum PassError {
    #[error("failed to fetch source page: {0}")]
    Fetch(#[from] FetchError),

    #[error("posting extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("existing job lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// What happened to one new posting.
enum JobOutcome {
    Added(JobSummary),
    Skipped(JobSummary),
}

/// How a posting should be reported once persisted.
#[derive(Clone, Copy)]
enum Verdict {
    Added,
    Skipped(SkipReason),
}

/// Run the pass for one source.
pub(crate) async fn scan_source(ctx: &Arc<SourceContext>, source: &Source) -> SourceScanResult {
    let _active = ctx.tracker.begin_source(&source.name);
    let mut result = SourceScanResult::new(source);

    info!(source = %source.name, url = %source.url, "Scanning source");

    let postings = match discover(ctx, source).await {
        Ok(postings) => postings,
        Err(e) => {
            warn!(source = %source.name, error = %e, "Source scan failed");
            result.error = Some(e.to_string());
            return result;
        }
    };
    let discovered_at = Utc::now();

    if let Err(e) = process(ctx, source, postings, &mut result).await {
        warn!(source = %source.name, error = %e, "Source scan failed after discovery");
        result.error = Some(e.to_string());
    }

    // Discovery succeeded, so the attempt counts even if later steps failed
    if let Err(e) = ctx
        .deps
        .store
        .update_source_scanned(source.id, discovered_at)
        .await
    {
        warn!(source = %source.name, error = %e, "Failed to record scan time");
    }

    info!(
        source = %source.name,
        found = result.jobs_found,
        added = result.jobs_added,
        skipped = result.jobs_skipped,
        "Source scan complete"
    );

    result
}

async fn discover(ctx: &SourceContext, source: &Source) -> Result<Vec<DiscoveredPosting>, PassError> {
    let content = ctx
        .deps
        .fetcher
        .fetch(&source.url, ContentFormat::Structured)
        .await?;

    let filter = effective_filter(
        ctx.global_filter.as_deref(),
        source.filter_description.as_deref(),
    );

    let extractor = ctx.deps.extractor.clone();
    let postings = tokio::spawn(async move { extractor.extract(&content, &filter).await })
        .await
        .map_err(|e| ExtractionError::Aborted(e.to_string()))??;

    debug!(source = %source.name, count = postings.len(), "Postings discovered");
    Ok(postings)
}

async fn process(
    ctx: &Arc<SourceContext>,
    source: &Source,
    postings: Vec<DiscoveredPosting>,
    result: &mut SourceScanResult,
) -> Result<(), PassError> {
    result.jobs_found = postings.len();
    ctx.tracker.record_jobs_found(postings.len());

    let candidates = normalize(source, postings, result);
    if candidates.is_empty() {
        return Ok(());
    }

    let urls: Vec<String> = candidates.iter().map(|p| p.url.clone()).collect();
    let existing: HashMap<String, Job> = ctx
        .deps
        .store
        .find_by_urls(&urls)
        .await?
        .into_iter()
        .map(|job| (job.url.clone(), job))
        .collect();

    let mut fresh = Vec::with_capacity(candidates.len());
    for posting in candidates {
        match existing.get(&posting.url) {
            Some(job) => result.push_skipped(JobSummary::existing(&posting, job)),
            None => fresh.push(posting),
        }
    }

    debug!(
        source = %source.name,
        new = fresh.len(),
        existing = existing.len(),
        "Existing jobs filtered"
    );

    for outcome in process_new(ctx, source, fresh).await {
        match outcome {
            JobOutcome::Added(summary) => result.push_added(summary),
            JobOutcome::Skipped(summary) => result.push_skipped(summary),
        }
    }

    Ok(())
}

/// Resolve URLs and keep the first posting per resolved URL.
fn normalize(
    source: &Source,
    postings: Vec<DiscoveredPosting>,
    result: &mut SourceScanResult,
) -> Vec<DiscoveredPosting> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(postings.len());

    for posting in postings {
        let url = match resolve(&posting.url, &source.url) {
            Ok(url) => url,
            Err(e) => {
                warn!(source = %source.name, url = %posting.url, error = %e, "Dropping posting with unusable URL");
                continue;
            }
        };

        let posting = posting.with_url(url);
        if seen.insert(posting.url.clone()) {
            out.push(posting);
        } else {
            result.push_skipped(JobSummary::skipped(&posting, None, SkipReason::AlreadyExists));
        }
    }

    out
}

/// Run the per-job pipeline for new postings.
///
/// Task starts are spaced by `job_start_delay`, and at most
/// `max_concurrent_jobs` run at once. The limit is per source.
async fn process_new(
    ctx: &Arc<SourceContext>,
    source: &Source,
    postings: Vec<DiscoveredPosting>,
) -> Vec<JobOutcome> {
    let semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_jobs.max(1)));
    let delay = ctx.config.job_start_delay();
    let mut tasks = FuturesUnordered::new();

    for posting in postings {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reported = posting.clone();
        let task_ctx = ctx.clone();
        let semaphore = semaphore.clone();
        let source_id = source.id;

        let handle = tokio::spawn(async move {
            // Permit held for the whole job; the pool is never closed
            let _permit = semaphore.acquire_owned().await;
            process_posting(&task_ctx, source_id, posting).await
        });
        tasks.push(async move { (reported, handle.await) });
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some((posting, joined)) = tasks.next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(source = %source.name, url = %posting.url, error = %e, "Job task aborted");
                outcomes.push(JobOutcome::Skipped(JobSummary::skipped(
                    &posting,
                    None,
                    SkipReason::ScrapeFailed,
                )));
            }
        }
    }
    outcomes
}

/// Score (when enabled), classify and persist one posting.
async fn process_posting(
    ctx: &SourceContext,
    source_id: i64,
    posting: DiscoveredPosting,
) -> JobOutcome {
    let mut score = None;
    let mut failure = None;

    if let Some((scorer, profile)) = ctx.scoring() {
        // Agent code runs on its own task so a panic there only costs the score
        let fetcher = ctx.deps.fetcher.clone();
        let url = posting.url.clone();
        let scored = tokio::spawn(fetch_and_score(fetcher, scorer, profile, url))
            .await
            .unwrap_or_else(|e| Err(format!("scoring aborted: {}", e)));

        match scored {
            Ok(scored) => {
                ctx.tracker.record_job_scored();
                debug!(url = %posting.url, score = scored.score, "Posting scored");
                score = Some(scored.score);
            }
            Err(message) => {
                warn!(url = %posting.url, error = %message, "Posting not scored");
                failure = Some(message);
            }
        }
    }

    let job = NewJob::new(&posting.url, &posting.company, &posting.title)
        .with_source(source_id)
        .with_score(score);

    let (job, verdict) = match (score, failure) {
        (Some(s), _) if ctx.config.is_low_score(s) => (
            job.with_status(JobStatus::Dismissed),
            Verdict::Skipped(SkipReason::LowScore),
        ),
        (_, Some(message)) if ctx.config.require_score => (
            job.with_status(JobStatus::Failed).with_error(message),
            Verdict::Skipped(SkipReason::ScrapeFailed),
        ),
        _ => (job, Verdict::Added),
    };

    persist(ctx, &posting, job, score, verdict).await
}

/// Fetch a posting's plain text and score it against the profile.
async fn fetch_and_score(
    fetcher: Arc<dyn ContentFetcher>,
    scorer: Arc<dyn ScoringAgent>,
    profile: Arc<str>,
    url: String,
) -> Result<JobScore, String> {
    let text = fetcher
        .fetch(&url, ContentFormat::Plain)
        .await
        .map_err(|e| format!("failed to fetch posting: {}", e))?;

    scorer
        .score(&text, &profile)
        .await
        .map_err(|e| format!("scoring failed: {}", e))
}

async fn persist(
    ctx: &SourceContext,
    posting: &DiscoveredPosting,
    job: NewJob,
    score: Option<u8>,
    verdict: Verdict,
) -> JobOutcome {
    let store = &ctx.deps.store;

    // Another source may have stored this URL since the batched lookup
    match store.find_by_url(&posting.url).await {
        Ok(Some(existing)) => return JobOutcome::Skipped(JobSummary::existing(posting, &existing)),
        Ok(None) => {}
        Err(e) => warn!(url = %posting.url, error = %e, "Existing job re-check failed"),
    }

    match store.insert(job).await {
        Ok(stored) => {
            debug!(id = stored.id, url = %stored.url, status = %stored.status, "Job stored");
            match verdict {
                Verdict::Added => JobOutcome::Added(JobSummary::added(posting, score)),
                Verdict::Skipped(reason) => {
                    JobOutcome::Skipped(JobSummary::skipped(posting, score, reason))
                }
            }
        }
        Err(StoreError::DuplicateUrl { .. }) => {
            debug!(url = %posting.url, "Job stored concurrently by another task");
            let existing_score = store
                .find_by_url(&posting.url)
                .await
                .ok()
                .flatten()
                .and_then(|j| j.score);
            JobOutcome::Skipped(JobSummary::skipped(
                posting,
                existing_score,
                SkipReason::AlreadyExists,
            ))
        }
        Err(e) => {
            error!(url = %posting.url, error = %e, "Failed to store job");
            JobOutcome::Skipped(JobSummary::skipped(posting, score, SkipReason::ScrapeFailed))
        }
    }
}
