// Collaborator adapters and dependency wiring

pub mod deps;
pub mod http_fetcher;
pub mod job_filter_client;
pub mod link_extractor;

pub use deps::*;
pub use http_fetcher::HttpFetcher;
pub use job_filter_client::JobFilterClient;
pub use link_extractor::LinkExtractor;
