//! HTTP content fetcher - reqwest + scraper
//!
//! - Structured fetches return the raw HTML so link structure survives
//! - Plain fetches return visible text (scripts/styles dropped, whitespace
//!   collapsed), or delegate to the scraper service when one is configured
//!
//! Limitations:
//! - No JavaScript rendering (use the scraper service for dynamic boards)

use anyhow::{Context, Result};
use async_trait::async_trait;
use job_scanner::{ContentFetcher, ContentFormat, FetchError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Elements whose text is never visible
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Page fetcher over plain HTTP
pub struct HttpFetcher {
    client: reqwest::Client,
    scraper_service_url: Option<String>,
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    title: Option<String>,
    text: String,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        // Use a browser-like User-Agent to avoid bot detection
        let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            scraper_service_url: None,
        })
    }

    /// Delegate plain-text fetches to a scraper service (`POST {base}/scrape`).
    pub fn with_scraper_service(mut self, base_url: Option<String>) -> Self {
        self.scraper_service_url = base_url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    /// Fetch raw HTML from a URL
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| request_error(url, e))
    }

    async fn fetch_via_service(&self, service: &str, url: &str) -> Result<String, FetchError> {
        let endpoint = format!("{}/scrape", service);
        let response = self
            .client
            .post(&endpoint)
            .json(&ScrapeRequest { url })
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let scraped: ScrapeResponse = response.json().await.map_err(|e| request_error(url, e))?;
        Ok(match scraped.title {
            Some(title) if !title.trim().is_empty() => format!("{}\n\n{}", title.trim(), scraped.text),
            _ => scraped.text,
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, format: ContentFormat) -> Result<String, FetchError> {
        debug!(url = %url, format = ?format, "Fetching");

        match (format, &self.scraper_service_url) {
            (ContentFormat::Structured, _) => self.fetch_html(url).await,
            (ContentFormat::Plain, Some(service)) => self.fetch_via_service(service, url).await,
            (ContentFormat::Plain, None) => {
                let html = self.fetch_html(url).await?;
                Ok(visible_text(&html))
            }
        }
    }
}

fn request_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_builder() {
        FetchError::InvalidUrl {
            url: url.to_string(),
        }
    } else {
        FetchError::Http(Box::new(e))
    }
}

/// Visible text of an HTML document, whitespace collapsed to single spaces.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut words = Vec::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}
