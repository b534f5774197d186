//! Concurrent job-board scanning.
//!
//! Fans a single refresh request out across configured job-board search pages
//! ("sources"), discovers postings with an extraction agent, deduplicates them
//! against the job store, optionally scores each against a reference profile,
//! and persists the results while pollers watch live progress.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use job_scanner::{MemoryStore, ScanConfig, ScanDeps, Scanner};
//! use job_scanner::testing::{MockExtractor, MockFetcher};
//!
//! let deps = ScanDeps::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MockFetcher::new()),
//!     Arc::new(MockExtractor::new()),
//! );
//! let scanner = Scanner::new(deps, ScanConfig::default());
//!
//! // Background scan; poll with `scanner.get_status()`
//! let handle = scanner.start_scan(None).await?;
//! let report = handle.wait().await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (fetcher, agents, stores, profile)
//! - [`types`] - Sources, jobs, postings, scan reports and configuration
//! - [`scan`] - The orchestrator and the single-source scanner
//! - [`status`] - Process-wide scan progress tracker
//! - [`resolver`] - Candidate URL resolution
//! - [`stores`] - Storage implementations
//! - [`testing`] - Mock collaborators for tests

pub mod error;
pub mod resolver;
pub mod scan;
pub mod status;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{
    ExtractionError, FetchError, ProfileError, ResolveError, ScanError, ScoringError, StoreError,
};
pub use scan::{effective_filter, ScanAccepted, ScanDeps, ScanHandle, ScanReport, Scanner};
pub use status::{ScanGuard, ScanStatus, ScanStatusTracker, SourceGuard};
pub use traits::{
    agent::{ExtractionAgent, ScoringAgent},
    fetcher::{ContentFetcher, ContentFormat},
    profile::{FileProfile, InlineProfile, ProfileSource},
    store::{JobStore, ScanStore, SettingsStore, SourceStore, GLOBAL_FILTER_KEY},
};
pub use types::{
    config::ScanConfig,
    job::{Job, JobStatus, NewJob},
    posting::{DiscoveredPosting, JobScore},
    report::{JobSummary, SkipReason, SourceScanResult},
    source::{NewSource, Source},
};
pub use resolver::resolve;

pub use stores::MemoryStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;
