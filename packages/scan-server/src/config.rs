use anyhow::{Context, Result};
use dotenvy::dotenv;
use job_scanner::ScanConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,

    /// Reference profile file (e.g. the master resume); scoring is off without it
    pub profile_path: Option<PathBuf>,

    /// Scraper service used for plain-text posting fetches
    pub scraper_service_url: Option<String>,

    /// Job filter service used for scoring
    pub job_filter_url: Option<String>,

    pub global_filter: Option<String>,
    pub allowed_origins: Vec<String>,
    pub max_concurrent_sources: usize,
    pub max_concurrent_jobs: usize,
    pub job_start_delay_ms: u64,
    pub low_score_threshold: u8,
    pub require_score: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = ScanConfig::default();
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://job_scanner.db".to_string()),
            port: parse(&lookup, "PORT", 8080)?,
            profile_path: optional("PROFILE_PATH").map(PathBuf::from),
            scraper_service_url: optional("SCRAPER_SERVICE_URL"),
            job_filter_url: optional("JOB_FILTER_URL"),
            global_filter: optional("GLOBAL_FILTER"),
            allowed_origins: optional("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            max_concurrent_sources: parse(
                &lookup,
                "MAX_CONCURRENT_SOURCES",
                defaults.max_concurrent_sources,
            )?,
            max_concurrent_jobs: parse(&lookup, "MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs)?,
            job_start_delay_ms: parse(&lookup, "JOB_START_DELAY_MS", defaults.job_start_delay_ms)?,
            low_score_threshold: parse(
                &lookup,
                "LOW_SCORE_THRESHOLD",
                defaults.low_score_threshold,
            )?,
            require_score: parse(&lookup, "REQUIRE_SCORE", defaults.require_score)?,
        })
    }

    /// Orchestrator settings derived from this configuration
    pub fn scan_config(&self) -> ScanConfig {
        let config = ScanConfig::default()
            .with_max_concurrent_sources(self.max_concurrent_sources)
            .with_max_concurrent_jobs(self.max_concurrent_jobs)
            .with_job_start_delay(Duration::from_millis(self.job_start_delay_ms))
            .with_low_score_threshold(self.low_score_threshold)
            .require_score(self.require_score);

        match &self.global_filter {
            Some(filter) => config.with_global_filter(filter.clone()),
            None => config,
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got {:?}", name, value)),
        None => Ok(default),
    }
}
