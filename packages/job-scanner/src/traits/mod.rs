//! Collaborator abstractions consumed by the scanner.
//!
//! Applications implement these to provide page fetching, the extraction and
//! scoring agents, persistence and the reference profile.

pub mod agent;
pub mod fetcher;
pub mod profile;
pub mod store;
