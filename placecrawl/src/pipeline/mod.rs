//! Paginated extraction and geocoding runs.
//!
//! This module provides:
//! - [`PaginationPipeline`], the fetch, extract and geocode loop
//! - [`CrawlLauncher`] and [`RunHandle`] for spawning and cancelling runs
//! - Request, result and summary models

mod launcher;
mod models;
mod runner;

#[cfg(test)]
mod integration_tests;

pub use launcher::{CrawlLauncher, RunHandle};
pub use models::{parse_start_url, CrawlRequest, PageResult, RunSummary};
pub use runner::PaginationPipeline;
