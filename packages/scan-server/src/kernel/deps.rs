//! Scanner dependency wiring from configuration.

use anyhow::Result;
use job_scanner::{FileProfile, InlineProfile, ScanDeps, ScanStore, Scanner};
use std::sync::Arc;
use tracing::{info, warn};

use super::{HttpFetcher, JobFilterClient, LinkExtractor};
use crate::config::Config;

/// Build the scanner's collaborators.
///
/// Scoring is wired only when a job filter endpoint is configured; it then
/// also needs a readable profile at scan time.
pub fn build_scan_deps(config: &Config, store: Arc<dyn ScanStore>) -> Result<ScanDeps> {
    let fetcher = HttpFetcher::new()?.with_scraper_service(config.scraper_service_url.clone());
    let mut deps = ScanDeps::new(store, Arc::new(fetcher), Arc::new(LinkExtractor::new()));

    match &config.job_filter_url {
        Some(url) => {
            info!(endpoint = %url, "Scoring via job filter service");
            deps = deps.with_scorer(Arc::new(JobFilterClient::new(url.clone())?));
        }
        None => info!("JOB_FILTER_URL not set; postings will not be scored"),
    }

    deps = match &config.profile_path {
        Some(path) => deps.with_profile(Arc::new(FileProfile::new(path))),
        None => {
            if config.job_filter_url.is_some() {
                warn!("PROFILE_PATH not set; scoring disabled");
            }
            deps.with_profile(Arc::new(InlineProfile::none()))
        }
    };

    Ok(deps)
}

/// Build the scanner over `store`.
pub fn build_scanner(config: &Config, store: Arc<dyn ScanStore>) -> Result<Scanner> {
    let deps = build_scan_deps(config, store)?;
    Ok(Scanner::new(deps, config.scan_config()))
}
