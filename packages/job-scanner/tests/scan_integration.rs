//! Integration tests for the scan orchestrator.
//!
//! These tests drive full scans against the in-memory store and mock
//! collaborators:
//! 1. Discovery, resolution and persistence
//! 2. Dedup against the store and within a batch
//! 3. Scoring and classification
//! 4. Concurrency bounds and fault isolation
//! 5. Progress status

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use job_scanner::{
    testing::{MockExtractor, MockFetcher, MockScorer},
    ContentFormat, DiscoveredPosting, InlineProfile, Job, JobStatus, JobStore, MemoryStore,
    NewJob, NewSource, ProfileError, ProfileSource, ScanConfig, ScanDeps, ScanError, Scanner,
    SettingsStore, SkipReason, Source, SourceStore, StoreError, GLOBAL_FILTER_KEY,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config without start delays, so tests stay fast.
fn fast_config() -> ScanConfig {
    ScanConfig::default().with_job_start_delay(Duration::ZERO)
}

fn posting(title: &str, url: &str) -> DiscoveredPosting {
    DiscoveredPosting::new(title, "Acme", url)
}

async fn add_source(store: &MemoryStore, name: &str, url: &str) -> Source {
    store
        .create_source(NewSource::new(name, url))
        .await
        .unwrap()
}

fn scanner(
    store: &Arc<MemoryStore>,
    fetcher: &Arc<MockFetcher>,
    extractor: &Arc<MockExtractor>,
    config: ScanConfig,
) -> Scanner {
    init_tracing();
    let deps = ScanDeps::new(store.clone(), fetcher.clone(), extractor.clone());
    Scanner::new(deps, config)
}

fn scoring_scanner(
    store: &Arc<MemoryStore>,
    fetcher: &Arc<MockFetcher>,
    extractor: &Arc<MockExtractor>,
    scorer: &Arc<MockScorer>,
    config: ScanConfig,
) -> Scanner {
    init_tracing();
    let deps = ScanDeps::new(store.clone(), fetcher.clone(), extractor.clone())
        .with_scorer(scorer.clone())
        .with_profile(Arc::new(InlineProfile::new("Rust engineer, 8 years")));
    Scanner::new(deps, config)
}

#[tokio::test]
async fn test_scan_resolves_and_stores_new_jobs() {
    let store = Arc::new(MemoryStore::new());
    let source = add_source(&store, "Board", "https://b.com/search?q=rust").await;

    let fetcher = Arc::new(MockFetcher::new().with_page("https://b.com/search?q=rust", "page-b"));
    let extractor = Arc::new(MockExtractor::new().with_postings(
        "page-b",
        vec![
            posting("Rust Dev", "/jobs/1"),
            posting("Go Dev", "jobs/2"),
            posting("Elsewhere", "https://x.com/j"),
        ],
    ));

    let report = scanner(&store, &fetcher, &extractor, fast_config())
        .run_scan(None)
        .await
        .unwrap();

    let result = report.result_for(source.id).unwrap();
    assert!(result.is_success());
    assert_eq!(result.jobs_found, 3);
    assert_eq!(result.jobs_added, 3);
    assert_eq!(result.jobs_skipped, 0);

    for url in ["https://b.com/jobs/1", "https://b.com/jobs/2", "https://x.com/j"] {
        let job = store.job_by_url(url).unwrap();
        assert_eq!(job.status, JobStatus::Suggested);
        assert_eq!(job.score, None);
        assert_eq!(job.source_id, Some(source.id));
    }
}

#[tokio::test]
async fn test_rescan_skips_existing_jobs() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(MockFetcher::new().with_page("https://b.com/search", "page"));
    let extractor = Arc::new(MockExtractor::new().with_postings(
        "page",
        vec![posting("A", "/jobs/1"), posting("B", "/jobs/2")],
    ));
    let scanner = scanner(&store, &fetcher, &extractor, fast_config());

    let first = scanner.run_scan(None).await.unwrap();
    assert_eq!(first.jobs_added(), 2);

    let second = scanner.run_scan(None).await.unwrap();
    assert_eq!(second.jobs_added(), 0);
    assert_eq!(second.jobs_skipped(), 2);
    assert!(second.results[0]
        .skipped
        .iter()
        .all(|s| s.skip_reason == Some(SkipReason::AlreadyExists)));
    assert_eq!(store.job_count(), 2);
}

#[tokio::test]
async fn test_duplicate_urls_within_batch() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(MockFetcher::new().with_page("https://b.com/search", "page"));
    let extractor = Arc::new(MockExtractor::new().with_postings(
        "page",
        vec![
            posting("First", "/jobs/1"),
            posting("Second", "https://b.com/jobs/1"),
        ],
    ));

    let report = scanner(&store, &fetcher, &extractor, fast_config())
        .run_scan(None)
        .await
        .unwrap();

    let result = &report.results[0];
    assert_eq!(result.jobs_found, 2);
    assert_eq!(result.jobs_added, 1);
    assert_eq!(result.added[0].title, "First");
    assert_eq!(result.skipped[0].skip_reason, Some(SkipReason::AlreadyExists));
    assert_eq!(store.job_count(), 1);
}

#[tokio::test]
async fn test_same_url_from_two_sources_stored_once() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "A", "https://a.com/search").await;
    add_source(&store, "B", "https://b.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://a.com/search", "page-a")
            .with_page("https://b.com/search", "page-b"),
    );
    let extractor = Arc::new(
        MockExtractor::new()
            .with_postings("page-a", vec![posting("Shared", "https://x.com/j")])
            .with_postings("page-b", vec![posting("Shared", "https://x.com/j")]),
    );

    let report = scanner(&store, &fetcher, &extractor, fast_config())
        .run_scan(None)
        .await
        .unwrap();

    assert_eq!(store.job_count(), 1);
    assert_eq!(report.jobs_added(), 1);
    assert_eq!(report.jobs_skipped(), 1);
}

#[tokio::test]
async fn test_unusable_urls_are_dropped() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(MockFetcher::new().with_page("https://b.com/search", "page"));
    let extractor = Arc::new(MockExtractor::new().with_postings(
        "page",
        vec![posting("Mail", "mailto:jobs@b.com"), posting("Real", "/jobs/1")],
    ));

    let report = scanner(&store, &fetcher, &extractor, fast_config())
        .run_scan(None)
        .await
        .unwrap();

    let result = &report.results[0];
    assert_eq!(result.jobs_found, 2);
    assert_eq!(result.jobs_added, 1);
    assert_eq!(result.jobs_skipped, 0);
}

#[tokio::test]
async fn test_low_score_threshold_is_inclusive() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://b.com/search", "page")
            .with_text("https://b.com/jobs/49", "text-49")
            .with_text("https://b.com/jobs/50", "text-50"),
    );
    let extractor = Arc::new(MockExtractor::new().with_postings(
        "page",
        vec![posting("Weak", "/jobs/49"), posting("Okay", "/jobs/50")],
    ));
    let scorer = Arc::new(MockScorer::new().with_score("text-49", 49).with_score("text-50", 50));

    let scanner = scoring_scanner(&store, &fetcher, &extractor, &scorer, fast_config());
    let report = scanner.run_scan(None).await.unwrap();

    let result = &report.results[0];
    assert_eq!(result.jobs_added, 1);
    assert_eq!(result.added[0].score, Some(50));
    assert_eq!(result.jobs_skipped, 1);
    assert_eq!(result.skipped[0].score, Some(49));
    assert_eq!(result.skipped[0].skip_reason, Some(SkipReason::LowScore));

    let weak = store.job_by_url("https://b.com/jobs/49").unwrap();
    assert_eq!(weak.status, JobStatus::Dismissed);
    assert_eq!(weak.score, Some(49));

    assert_eq!(scanner.get_status().jobs_scored, 2);
}

#[tokio::test]
async fn test_no_profile_disables_scoring() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://b.com/search", "page")
            .with_text("https://b.com/jobs/1", "text"),
    );
    let extractor =
        Arc::new(MockExtractor::new().with_postings("page", vec![posting("A", "/jobs/1")]));
    let scorer = Arc::new(MockScorer::new().with_default_score(10));

    // Scorer configured, but the profile source yields nothing
    let deps = ScanDeps::new(store.clone(), fetcher.clone(), extractor.clone())
        .with_scorer(scorer.clone())
        .with_profile(Arc::new(InlineProfile::none()));
    let report = Scanner::new(deps, fast_config()).run_scan(None).await.unwrap();

    assert_eq!(report.jobs_added(), 1);
    assert_eq!(report.results[0].added[0].score, None);
    assert_eq!(scorer.call_count(), 0);
    assert_eq!(fetcher.call_count(ContentFormat::Plain), 0);
}

#[tokio::test]
async fn test_scoring_failures_are_swallowed() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://b.com/search", "page")
            .with_text("https://b.com/jobs/1", "unscorable"),
    );
    // jobs/2 has no plain text, so its fetch fails
    let extractor = Arc::new(MockExtractor::new().with_postings(
        "page",
        vec![posting("A", "/jobs/1"), posting("B", "/jobs/2")],
    ));
    let scorer = Arc::new(MockScorer::new().with_failure("unscorable"));

    let report = scoring_scanner(&store, &fetcher, &extractor, &scorer, fast_config())
        .run_scan(None)
        .await
        .unwrap();

    let result = &report.results[0];
    assert!(result.is_success());
    assert_eq!(result.jobs_added, 2);
    assert!(result.added.iter().all(|s| s.score.is_none()));
}

#[tokio::test]
async fn test_panicking_scorer_keeps_posting() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://b.com/search", "page")
            .with_text("https://b.com/jobs/1", "explode")
            .with_text("https://b.com/jobs/2", "good"),
    );
    let extractor = Arc::new(MockExtractor::new().with_postings(
        "page",
        vec![posting("A", "/jobs/1"), posting("B", "/jobs/2")],
    ));
    let scorer = Arc::new(MockScorer::new().with_panic("explode").with_score("good", 80));

    let report = scoring_scanner(&store, &fetcher, &extractor, &scorer, fast_config())
        .run_scan(None)
        .await
        .unwrap();

    let result = &report.results[0];
    assert!(result.is_success());
    assert_eq!(result.jobs_found, 2);
    assert_eq!(result.jobs_added, 2);

    let unscored = store.job_by_url("https://b.com/jobs/1").unwrap();
    assert_eq!(unscored.score, None);
    assert_eq!(unscored.status, JobStatus::Suggested);
    assert_eq!(store.job_by_url("https://b.com/jobs/2").unwrap().score, Some(80));
}

#[tokio::test]
async fn test_panicking_scorer_with_required_score() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://b.com/search", "page")
            .with_text("https://b.com/jobs/1", "explode"),
    );
    let extractor = Arc::new(
        MockExtractor::new().with_postings("page", vec![posting("A", "/jobs/1")]),
    );
    let scorer = Arc::new(MockScorer::new().with_panic("explode"));

    let config = fast_config().require_score(true);
    let report = scoring_scanner(&store, &fetcher, &extractor, &scorer, config)
        .run_scan(None)
        .await
        .unwrap();

    let result = &report.results[0];
    assert_eq!(result.jobs_skipped, 1);
    assert_eq!(result.skipped[0].skip_reason, Some(SkipReason::ScrapeFailed));

    let failed = store.job_by_url("https://b.com/jobs/1").unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error_message.unwrap().contains("scoring aborted"));
}

#[tokio::test]
async fn test_require_score_reports_scrape_failed() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://b.com/search", "page")
            .with_text("https://b.com/jobs/1", "good"),
    );
    let extractor = Arc::new(MockExtractor::new().with_postings(
        "page",
        vec![posting("Good", "/jobs/1"), posting("Gone", "/jobs/2")],
    ));
    let scorer = Arc::new(MockScorer::new().with_score("good", 80));

    let config = fast_config().require_score(true);
    let report = scoring_scanner(&store, &fetcher, &extractor, &scorer, config)
        .run_scan(None)
        .await
        .unwrap();

    let result = &report.results[0];
    assert_eq!(result.jobs_added, 1);
    assert_eq!(result.skipped[0].skip_reason, Some(SkipReason::ScrapeFailed));

    let failed = store.job_by_url("https://b.com/jobs/2").unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error_message.is_some());
}

#[tokio::test]
async fn test_bounded_source_concurrency() {
    let store = Arc::new(MemoryStore::new());
    let mut fetcher = MockFetcher::new().with_latency(Duration::from_millis(50));
    for i in 0..5 {
        let url = format!("https://board{}.com/search", i);
        add_source(&store, &format!("Board {}", i), &url).await;
        fetcher = fetcher.with_page(url, format!("page-{}", i));
    }
    let fetcher = Arc::new(fetcher);
    let extractor = Arc::new(MockExtractor::new());

    let config = fast_config().with_max_concurrent_sources(2);
    let scanner = scanner(&store, &fetcher, &extractor, config);

    let started = Instant::now();
    let handle = scanner.start_scan(None).await.unwrap();
    assert_eq!(handle.accepted().sources_total, 5);

    loop {
        let status = scanner.get_status();
        assert!(status.active_sources.len() <= 2);
        if !status.is_scanning {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let report = handle.wait().await.unwrap();

    // Five sources, two at a time: at least three rounds of latency
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(fetcher.peak_in_flight(ContentFormat::Structured), 2);
    assert_eq!(report.results.len(), 5);
}

#[tokio::test]
async fn test_bounded_job_concurrency_and_spacing() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let mut fetcher = MockFetcher::new()
        .with_latency(Duration::from_millis(40))
        .with_page("https://b.com/search", "page");
    let mut postings = Vec::new();
    for i in 0..6 {
        let url = format!("https://b.com/jobs/{}", i);
        fetcher = fetcher.with_text(&url, format!("text-{}", i));
        postings.push(posting(&format!("Job {}", i), &url));
    }
    let fetcher = Arc::new(fetcher);
    let extractor = Arc::new(MockExtractor::new().with_postings("page", postings));
    let scorer = Arc::new(MockScorer::new().with_default_score(75));

    let config = ScanConfig::default()
        .with_max_concurrent_jobs(2)
        .with_job_start_delay(Duration::from_millis(10));

    let started = Instant::now();
    let report = scoring_scanner(&store, &fetcher, &extractor, &scorer, config)
        .run_scan(None)
        .await
        .unwrap();

    assert_eq!(report.jobs_added(), 6);
    assert!(fetcher.peak_in_flight(ContentFormat::Plain) <= 2);
    // One delay before each of the six job starts
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_source_failures_are_isolated() {
    let store = Arc::new(MemoryStore::new());
    let down = add_source(&store, "Down", "https://down.com/search").await;
    let broken = add_source(&store, "Broken", "https://broken.com/search").await;
    let fine = add_source(&store, "Fine", "https://fine.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_failure("https://down.com/search")
            .with_page("https://broken.com/search", "garbage")
            .with_page("https://fine.com/search", "page"),
    );
    let extractor = Arc::new(
        MockExtractor::new()
            .with_failure("garbage")
            .with_postings("page", vec![posting("A", "/jobs/1")]),
    );

    let scanner = scanner(&store, &fetcher, &extractor, fast_config());
    let report = scanner.run_scan(None).await.unwrap();

    assert_eq!(report.results.len(), 3);
    assert!(report.result_for(down.id).unwrap().error.is_some());
    assert!(report.result_for(broken.id).unwrap().error.is_some());
    assert_eq!(report.result_for(fine.id).unwrap().jobs_added, 1);

    let status = scanner.get_status();
    assert!(status.error.is_none());
    assert_eq!(status.sources_completed, 3);
    assert_eq!(status.source_results.len(), 3);
    assert_eq!(status.current_step, "Complete");
}

#[tokio::test]
async fn test_panicking_agent_does_not_stall_scan() {
    let store = Arc::new(MemoryStore::new());
    let bad = add_source(&store, "Bad", "https://bad.com/search").await;
    let good = add_source(&store, "Good", "https://good.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://bad.com/search", "explode")
            .with_page("https://good.com/search", "page"),
    );
    let extractor = Arc::new(
        MockExtractor::new()
            .with_panic("explode")
            .with_postings("page", vec![posting("A", "/jobs/1")]),
    );

    let scanner = scanner(&store, &fetcher, &extractor, fast_config());
    let report = scanner.run_scan(None).await.unwrap();

    assert!(report.result_for(bad.id).unwrap().error.is_some());
    assert_eq!(report.result_for(good.id).unwrap().jobs_added, 1);

    let status = scanner.get_status();
    assert!(!status.is_scanning);
    assert!(status.active_sources.is_empty());
    assert_eq!(status.sources_completed, 2);
}

#[tokio::test]
async fn test_second_scan_rejected_while_running() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Slow", "https://slow.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_latency(Duration::from_millis(100))
            .with_page("https://slow.com/search", "page"),
    );
    let extractor = Arc::new(MockExtractor::new());
    let scanner = scanner(&store, &fetcher, &extractor, fast_config());

    let handle = scanner.start_scan(None).await.unwrap();
    let rejected = scanner.start_scan(None).await;
    assert!(matches!(rejected, Err(ScanError::AlreadyScanning)));
    // The running scan is untouched by the rejection
    assert_eq!(scanner.get_status().scan_id, Some(handle.scan_id()));

    handle.wait().await.unwrap();
    assert!(scanner.start_scan(None).await.is_ok());
}

#[tokio::test]
async fn test_no_sources_rejected() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(MockFetcher::new());
    let extractor = Arc::new(MockExtractor::new());
    let scanner = scanner(&store, &fetcher, &extractor, fast_config());

    let err = scanner.start_scan(None).await.unwrap_err();
    assert!(matches!(err, ScanError::NoSources));
    assert_eq!(err.reason(), "no_sources");

    let status = scanner.get_status();
    assert!(!status.is_scanning);
    assert!(status.error.is_some());

    add_source(&store, "Board", "https://b.com").await;
    assert!(matches!(
        scanner.start_scan(Some(&[999][..])).await,
        Err(ScanError::NoSources)
    ));
}

#[tokio::test]
async fn test_scan_selected_sources_only() {
    let store = Arc::new(MemoryStore::new());
    let a = add_source(&store, "A", "https://a.com/search").await;
    let b = add_source(&store, "B", "https://b.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://a.com/search", "page-a")
            .with_page("https://b.com/search", "page-b"),
    );
    let extractor = Arc::new(MockExtractor::new());

    let report = scanner(&store, &fetcher, &extractor, fast_config())
        .run_scan(Some(&[b.id][..]))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].source_id, b.id);
    assert!(store.source(a.id).unwrap().last_scanned_at.is_none());
    assert!(store.source(b.id).unwrap().last_scanned_at.is_some());
}

#[tokio::test]
async fn test_last_scanned_requires_discovery() {
    let store = Arc::new(MemoryStore::new());
    let down = add_source(&store, "Down", "https://down.com/search").await;
    let up = add_source(&store, "Up", "https://up.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_failure("https://down.com/search")
            .with_page("https://up.com/search", "page"),
    );
    // Posting text fetch fails, which must not affect the source timestamp
    let extractor =
        Arc::new(MockExtractor::new().with_postings("page", vec![posting("A", "/jobs/1")]));
    let scorer = Arc::new(MockScorer::new().with_default_score(90));

    scoring_scanner(&store, &fetcher, &extractor, &scorer, fast_config())
        .run_scan(None)
        .await
        .unwrap();

    assert!(store.source(down.id).unwrap().last_scanned_at.is_none());
    assert!(store.source(up.id).unwrap().last_scanned_at.is_some());
}

#[tokio::test]
async fn test_global_and_source_filters_combined() {
    let store = Arc::new(MemoryStore::new());
    store
        .create_source(NewSource::new("Board", "https://b.com/search").with_filter("Rust roles"))
        .await
        .unwrap();
    store.set_setting(GLOBAL_FILTER_KEY, "Remote only").await.unwrap();

    let fetcher = Arc::new(MockFetcher::new().with_page("https://b.com/search", "page"));
    let extractor = Arc::new(MockExtractor::new());

    // The stored setting wins over the configured fallback
    let config = fast_config().with_global_filter("Onsite");
    scanner(&store, &fetcher, &extractor, config)
        .run_scan(None)
        .await
        .unwrap();

    assert_eq!(extractor.filters(), vec!["Remote only\n\nRust roles".to_string()]);
}

#[tokio::test]
async fn test_status_aggregates_progress() {
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "A", "https://a.com/search").await;
    add_source(&store, "B", "https://b.com/search").await;

    let fetcher = Arc::new(
        MockFetcher::new()
            .with_page("https://a.com/search", "page-a")
            .with_page("https://b.com/search", "page-b"),
    );
    let extractor = Arc::new(
        MockExtractor::new()
            .with_postings("page-a", vec![posting("A1", "/1"), posting("A2", "/2")])
            .with_postings("page-b", vec![posting("B1", "/1")]),
    );

    let scanner = scanner(&store, &fetcher, &extractor, fast_config());
    let report = scanner.run_scan(None).await.unwrap();
    let status = scanner.get_status();

    assert_eq!(status.scan_id, Some(report.scan_id));
    assert_eq!(status.sources_total, 2);
    assert_eq!(status.sources_completed, 2);
    assert_eq!(status.jobs_found, 3);
    assert_eq!(status.jobs_scored, 0);
    assert!(status.finished_at.is_some());
    assert_eq!(status.source_results, report.results);
}

/// Profile backend that panics when loaded.
struct PanickingProfile;

#[async_trait]
impl ProfileSource for PanickingProfile {
    async fn load_profile(&self) -> Result<Option<String>, ProfileError> {
        panic!("profile backend exploded");
    }
}

#[tokio::test]
async fn test_panic_outside_source_tasks_fails_scan() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    add_source(&store, "Board", "https://b.com/search").await;

    let fetcher = Arc::new(MockFetcher::new().with_page("https://b.com/search", "page"));
    let extractor = Arc::new(MockExtractor::new());
    let deps = ScanDeps::new(store.clone(), fetcher.clone(), extractor.clone())
        .with_scorer(Arc::new(MockScorer::new().with_default_score(80)))
        .with_profile(Arc::new(PanickingProfile));
    let scanner = Scanner::new(deps, fast_config());

    let outcome = scanner.run_scan(None).await;
    assert!(matches!(outcome, Err(ScanError::TaskFailed(ref m)) if m.contains("profile backend exploded")));

    let status = scanner.get_status();
    assert!(!status.is_scanning);
    assert!(status.error.unwrap().contains("profile backend exploded"));
    assert_eq!(status.current_step, "Failed");
    assert_eq!(status.sources_completed, status.sources_total);
    assert!(status.active_sources.is_empty());

    // The tracker is free for the next scan
    assert!(scanner.start_scan(None).await.is_ok());
}

/// Memory store whose inserts fail for chosen URLs.
struct RejectingStore {
    inner: MemoryStore,
    rejected: Vec<String>,
}

#[async_trait]
impl JobStore for RejectingStore {
    async fn find_by_urls(&self, urls: &[String]) -> Result<Vec<Job>, StoreError> {
        self.inner.find_by_urls(urls).await
    }

    async fn insert(&self, job: NewJob) -> Result<Job, StoreError> {
        if self.rejected.contains(&job.url) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.insert(job).await
    }

    async fn get_job(&self, id: i64) -> Result<Option<Job>, StoreError> {
        self.inner.get_job(id).await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.inner.list_jobs().await
    }
}

#[async_trait]
impl SourceStore for RejectingStore {
    async fn list_sources(&self) -> Result<Vec<Source>, StoreError> {
        self.inner.list_sources().await
    }

    async fn get_sources(&self, ids: &[i64]) -> Result<Vec<Source>, StoreError> {
        self.inner.get_sources(ids).await
    }

    async fn create_source(&self, source: NewSource) -> Result<Source, StoreError> {
        self.inner.create_source(source).await
    }

    async fn update_source_scanned(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.inner.update_source_scanned(id, at).await
    }
}

#[async_trait]
impl SettingsStore for RejectingStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_setting(key).await
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set_setting(key, value).await
    }
}

#[tokio::test]
async fn test_insert_failures_are_reported() {
    init_tracing();
    let store = Arc::new(RejectingStore {
        inner: MemoryStore::new(),
        rejected: vec!["https://b.com/jobs/2".to_string()],
    });
    store
        .create_source(NewSource::new("Board", "https://b.com/search"))
        .await
        .unwrap();

    let fetcher = Arc::new(MockFetcher::new().with_page("https://b.com/search", "page"));
    let extractor = Arc::new(MockExtractor::new().with_postings(
        "page",
        vec![posting("A", "/jobs/1"), posting("B", "/jobs/2")],
    ));
    let deps = ScanDeps::new(store.clone(), fetcher, extractor);
    let report = Scanner::new(deps, fast_config()).run_scan(None).await.unwrap();

    let result = &report.results[0];
    assert!(result.is_success());
    assert_eq!(result.jobs_found, result.jobs_added + result.jobs_skipped);
    assert_eq!(result.added[0].url, "https://b.com/jobs/1");
    assert_eq!(result.skipped[0].url, "https://b.com/jobs/2");
    assert_eq!(result.skipped[0].skip_reason, Some(SkipReason::ScrapeFailed));
    assert_eq!(store.inner.job_count(), 1);
}
