//! Link-based extraction agent.
//!
//! Lists anchors whose href looks like a job posting, narrowed to anchors
//! mentioning a filter keyword when the filter has any. Does no language
//! understanding, so the filter is reduced to its significant words.

use async_trait::async_trait;
use job_scanner::{DiscoveredPosting, ExtractionAgent, ExtractionError};
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// Href fragments that mark a job posting
const JOB_PATH_MARKERS: &[&str] = &[
    "/job/",
    "/jobs/",
    "/career/",
    "/careers/",
    "/position",
    "/opening",
    "/vacanc",
    "/viewjob",
    "jobid=",
    "job_id=",
    "/jk=",
];

/// Filter words too common to narrow anything
const STOP_WORDS: &[&str] = &[
    "and", "the", "for", "with", "only", "any", "all", "are", "job", "jobs", "role", "roles",
    "that", "this", "from", "into", "who", "not", "our", "you", "your", "must", "should",
];

const UNKNOWN_COMPANY: &str = "Unknown Company";

/// Upper bound on postings returned per page
const MAX_POSTINGS: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct LinkExtractor;

impl LinkExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExtractionAgent for LinkExtractor {
    async fn extract(
        &self,
        content: &str,
        filter: &str,
    ) -> Result<Vec<DiscoveredPosting>, ExtractionError> {
        let content = content.to_string();
        let keywords = keywords(filter);

        // HTML parsing is CPU-bound
        let postings = tokio::task::spawn_blocking(move || extract_links(&content, &keywords))
            .await
            .map_err(|e| ExtractionError::Aborted(e.to_string()))??;

        debug!(count = postings.len(), "Links extracted");
        Ok(postings)
    }
}

/// Significant lowercase words of a filter description
fn keywords(filter: &str) -> Vec<String> {
    filter
        .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Whether an href points below a job-path marker (not at the listing itself)
fn looks_like_posting(href: &str) -> bool {
    JOB_PATH_MARKERS.iter().any(|marker| {
        href.find(marker)
            .map(|pos| !href[pos + marker.len()..].trim_matches('/').is_empty())
            .unwrap_or(false)
    })
}

fn extract_links(html: &str, keywords: &[String]) -> Result<Vec<DiscoveredPosting>, ExtractionError> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]")
        .map_err(|e| ExtractionError::InvalidResponse(format!("invalid selector: {:?}", e)))?;

    let mut seen = HashSet::new();
    let mut postings = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        let title = anchor.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
        if title.is_empty() || href.is_empty() {
            continue;
        }

        let href_lower = href.to_lowercase();
        if !looks_like_posting(&href_lower) {
            continue;
        }

        if !keywords.is_empty() {
            let title_lower = title.to_lowercase();
            let mentioned = keywords
                .iter()
                .any(|k| title_lower.contains(k.as_str()) || href_lower.contains(k.as_str()));
            if !mentioned {
                continue;
            }
        }

        if !seen.insert(href.to_string()) {
            continue;
        }

        let company = anchor
            .value()
            .attr("data-company")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_COMPANY);

        postings.push(DiscoveredPosting::new(title, company, href));
        if postings.len() >= MAX_POSTINGS {
            break;
        }
    }

    Ok(postings)
}
