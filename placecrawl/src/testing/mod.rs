//! Testing utilities for crawl pipelines.
//!
//! This module provides:
//! - In-memory page chains, completion scripts and geocoding tables
//! - A helper assembling a pipeline from them
//! - A loopback HTTP server for exercising the upstream adapters

mod mocks;
mod server;

pub use mocks::{reply_for, FakePageChain, ScriptedCompletion, TableGeocoder, CHAIN_BASE};
pub use server::StubServer;

use std::sync::Arc;

use crate::config::{CompletionConfig, CrawlerConfig};
use crate::extraction::AddressExtractor;
use crate::pipeline::PaginationPipeline;

/// Assembles a pipeline from scripted collaborators and default settings.
#[must_use]
pub fn scripted_pipeline(
    pages: Arc<FakePageChain>,
    completion: Arc<ScriptedCompletion>,
    geocoder: Arc<TableGeocoder>,
) -> PaginationPipeline {
    let extractor = AddressExtractor::new(completion, &CompletionConfig::default());
    PaginationPipeline::new(pages, extractor, geocoder, &CrawlerConfig::default())
}
