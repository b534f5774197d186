//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the job scanner
//! without making real agent or network calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::error::{
    ExtractionError, ExtractionResult, FetchError, FetchResult, ScoringError, ScoringResult,
};
use crate::traits::{
    agent::{ExtractionAgent, ScoringAgent},
    fetcher::{ContentFetcher, ContentFormat},
};
use crate::types::posting::{DiscoveredPosting, JobScore};

/// Counts concurrent calls and remembers the peak.
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a InFlight);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A mock fetcher serving predefined pages.
///
/// Unknown URLs answer 404. Latency applies to every call, which makes it
/// handy for asserting concurrency bounds through [`MockFetcher::peak_in_flight`].
#[derive(Debug, Default)]
pub struct MockFetcher {
    structured: HashMap<String, String>,
    plain: HashMap<String, String>,
    failing: HashSet<String>,
    latency: Duration,

    /// Call tracking for assertions
    calls: Mutex<Vec<(String, ContentFormat)>>,
    structured_in_flight: InFlight,
    plain_in_flight: InFlight,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for structured fetches of `url`.
    pub fn with_page(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.structured.insert(url.into(), content.into());
        self
    }

    /// Serve `text` for plain fetches of `url`.
    pub fn with_text(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.plain.insert(url.into(), text.into());
        self
    }

    /// Fail every fetch of `url` with a transport error.
    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<(String, ContentFormat)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self, format: ContentFormat) -> usize {
        self.calls().iter().filter(|(_, f)| *f == format).count()
    }

    /// Highest number of simultaneous fetches seen for `format`.
    pub fn peak_in_flight(&self, format: ContentFormat) -> usize {
        match format {
            ContentFormat::Structured => self.structured_in_flight.peak(),
            ContentFormat::Plain => self.plain_in_flight.peak(),
        }
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str, format: ContentFormat) -> FetchResult<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), format));

        let _in_flight = match format {
            ContentFormat::Structured => self.structured_in_flight.enter(),
            ContentFormat::Plain => self.plain_in_flight.enter(),
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failing.contains(url) {
            return Err(FetchError::Http(format!("connection refused: {}", url).into()));
        }

        let pages = match format {
            ContentFormat::Structured => &self.structured,
            ContentFormat::Plain => &self.plain,
        };
        pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// A mock extraction agent keyed by page content.
///
/// Unknown content yields no postings.
#[derive(Debug, Default)]
pub struct MockExtractor {
    postings: HashMap<String, Vec<DiscoveredPosting>>,
    failing: HashSet<String>,
    panicking: HashSet<String>,

    /// (content, filter) per call
    calls: Mutex<Vec<(String, String)>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `postings` for pages whose content is `content`.
    pub fn with_postings(mut self, content: impl Into<String>, postings: Vec<DiscoveredPosting>) -> Self {
        self.postings.insert(content.into(), postings);
        self
    }

    /// Fail extraction for `content`.
    pub fn with_failure(mut self, content: impl Into<String>) -> Self {
        self.failing.insert(content.into());
        self
    }

    /// Panic while extracting `content`.
    pub fn with_panic(mut self, content: impl Into<String>) -> Self {
        self.panicking.insert(content.into());
        self
    }

    /// Filters passed to the agent, in call order.
    pub fn filters(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, filter)| filter.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl ExtractionAgent for MockExtractor {
    async fn extract(&self, content: &str, filter: &str) -> ExtractionResult<Vec<DiscoveredPosting>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((content.to_string(), filter.to_string()));

        if self.panicking.contains(content) {
            panic!("mock extractor panicked on {:?}", content);
        }
        if self.failing.contains(content) {
            return Err(ExtractionError::InvalidResponse(format!(
                "mock failure for {:?}",
                content
            )));
        }

        Ok(self.postings.get(content).cloned().unwrap_or_default())
    }
}

/// A mock scoring agent keyed by posting text.
///
/// Unknown text gets the default score, or an error when none is set.
#[derive(Debug, Default)]
pub struct MockScorer {
    scores: HashMap<String, i64>,
    default_score: Option<i64>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    calls: AtomicUsize,
}

impl MockScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, text: impl Into<String>, score: i64) -> Self {
        self.scores.insert(text.into(), score);
        self
    }

    pub fn with_default_score(mut self, score: i64) -> Self {
        self.default_score = Some(score);
        self
    }

    pub fn with_failure(mut self, text: impl Into<String>) -> Self {
        self.failing.insert(text.into());
        self
    }

    /// Panic when asked to score `text`.
    pub fn with_panic(mut self, text: impl Into<String>) -> Self {
        self.panicking.insert(text.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoringAgent for MockScorer {
    async fn score(&self, posting_text: &str, _profile: &str) -> ScoringResult<JobScore> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.panicking.contains(posting_text) {
            panic!("mock scorer panicked on {:?}", posting_text);
        }
        if self.failing.contains(posting_text) {
            return Err(ScoringError::Agent("mock scoring failure".into()));
        }

        match self.scores.get(posting_text).copied().or(self.default_score) {
            Some(score) => JobScore::new(score, "mock score"),
            None => Err(ScoringError::InvalidResponse(format!(
                "no mock score for {:?}",
                posting_text
            ))),
        }
    }
}
