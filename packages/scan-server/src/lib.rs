// Job Scanner - server core
//
// HTTP collaborators for the scan orchestrator (page fetcher, link-based
// extraction agent, job-filter scoring client) and the axum application
// exposing refresh, progress, sources and jobs.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
