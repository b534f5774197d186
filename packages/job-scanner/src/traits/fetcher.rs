//! Content fetcher trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;

/// Desired shape of fetched content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    /// Full markup with link structure intact (for discovery)
    Structured,

    /// Visible text only (for scoring)
    Plain,
}

/// Fetches page content by URL.
///
/// Fails with [`FetchError`](crate::FetchError) on network errors, timeouts
/// and non-2xx responses. Callers decide whether a failure is fatal.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str, format: ContentFormat) -> FetchResult<String>;
}
