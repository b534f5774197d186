//! Typed errors for the job scanner.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! rejected scan apart from a failing collaborator.

use thiserror::Error;

/// Errors returned by the scan orchestrator's public operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A scan is already running; refresh requests are not queued
    #[error("a scan is already in progress")]
    AlreadyScanning,

    /// The requested source set resolved to nothing
    #[error("no sources matched the scan request")]
    NoSources,

    /// Loading sources failed
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The supervised scan task ended abnormally
    #[error("scan task failed: {0}")]
    TaskFailed(String),
}

impl ScanError {
    /// Short machine-readable reason used by callers that report rejections.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AlreadyScanning => "already_scanning",
            Self::NoSources => "no_sources",
            Self::Storage(_) => "storage_error",
            Self::TaskFailed(_) => "task_failed",
        }
    }
}

/// Errors from the content fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Upstream answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Request timed out
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// URL could not be fetched at all
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors from the extraction agent.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Agent call failed
    #[error("extraction agent error: {0}")]
    Agent(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Agent answered with something that is not a posting list
    #[error("invalid extraction response: {0}")]
    InvalidResponse(String),

    /// The offloaded extraction task panicked or was cancelled
    #[error("extraction task aborted: {0}")]
    Aborted(String),
}

/// Errors from the scoring agent.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Agent call failed
    #[error("scoring agent error: {0}")]
    Agent(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Score outside 0..=100
    #[error("score out of range: {0}")]
    OutOfRange(i64),

    /// Agent answered with something that is not a score
    #[error("invalid scoring response: {0}")]
    InvalidResponse(String),
}

/// Errors from the job, source and settings stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A job with this URL already exists
    #[error("job already exists: {url}")]
    DuplicateUrl { url: String },

    /// Source not found
    #[error("source not found: {id}")]
    SourceNotFound { id: i64 },

    /// Backend failure
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored row could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Errors from loading the reference profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Reading the profile failed for a reason other than absence
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from URL resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Candidate URL was blank
    #[error("empty candidate URL")]
    Empty,

    /// Source URL is not an absolute http(s) URL with a host
    #[error("invalid source URL: {0}")]
    InvalidSource(String),

    /// Candidate could not be joined against the source root
    #[error("cannot resolve {candidate}: {reason}")]
    Unresolvable { candidate: String, reason: String },

    /// Candidate resolved to something other than http(s)
    #[error("unsupported scheme in {0}")]
    UnsupportedScheme(String),
}

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for extraction operations.
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for scoring operations.
pub type ScoringResult<T> = std::result::Result<T, ScoringError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
