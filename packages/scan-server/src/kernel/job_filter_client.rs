//! Scoring agent backed by the job filter service.
//!
//! Contract: `POST {base}` with `{"userProfile", "jobDescription"}` answers
//! `{"match_score": number, "reason": string}`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use job_scanner::{JobScore, ScoringAgent, ScoringError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Job descriptions longer than this are truncated before sending
const MAX_DESCRIPTION_CHARS: usize = 20_000;

pub struct JobFilterClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterRequest<'a> {
    user_profile: &'a str,
    job_description: &'a str,
}

#[derive(Deserialize)]
struct FilterResponse {
    match_score: f64,
    #[serde(default)]
    reason: String,
}

impl JobFilterClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create job filter HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ScoringAgent for JobFilterClient {
    async fn score(&self, posting_text: &str, profile: &str) -> Result<JobScore, ScoringError> {
        let description = truncate_chars(posting_text, MAX_DESCRIPTION_CHARS);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&FilterRequest {
                user_profile: profile,
                job_description: description,
            })
            .send()
            .await
            .map_err(|e| ScoringError::Agent(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::InvalidResponse(format!(
                "job filter answered HTTP {}",
                status
            )));
        }

        let body: FilterResponse = response
            .json()
            .await
            .map_err(|e| ScoringError::InvalidResponse(e.to_string()))?;

        debug!(score = body.match_score, "Job filter scored posting");
        to_score(body)
    }
}

fn to_score(body: FilterResponse) -> Result<JobScore, ScoringError> {
    if !body.match_score.is_finite() {
        return Err(ScoringError::InvalidResponse(format!(
            "non-numeric score: {}",
            body.match_score
        )));
    }
    JobScore::new(body.match_score.round() as i64, body.reason)
}

/// Longest prefix of `text` with at most `max` chars
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> FilterResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_score_rounds() {
        let score = to_score(response(r#"{"match_score": 72.6, "reason": "Good fit"}"#)).unwrap();
        assert_eq!(score.score, 73);
        assert_eq!(score.reasoning, "Good fit");
    }

    #[test]
    fn test_score_out_of_range() {
        assert!(matches!(
            to_score(response(r#"{"match_score": 140}"#)),
            Err(ScoringError::OutOfRange(140))
        ));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(FilterRequest {
            user_profile: "Rust",
            job_description: "Backend role",
        })
        .unwrap();
        assert_eq!(json["userProfile"], "Rust");
        assert_eq!(json["jobDescription"], "Backend role");
    }
}
