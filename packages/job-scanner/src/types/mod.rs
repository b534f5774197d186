//! Domain types for sources, jobs, discovered postings and scan reports.

pub mod config;
pub mod job;
pub mod posting;
pub mod report;
pub mod source;
