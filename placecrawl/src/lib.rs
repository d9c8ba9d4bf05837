//! # Placecrawl
//!
//! Walks a paginated web listing, pulls place names and postal addresses
//! out of each page with a text-completion service, geocodes them, and
//! streams one result event per page.
//!
//! - **Paginated runs**: follow "next page" links up to a page budget
//! - **Address extraction**: a stop-at-`]` prompt with lossy JSON repair
//! - **Best-effort geocoding**: bounded concurrency, misses dropped and counted
//! - **Event sinks**: per-page events plus one terminal event per run
//! - **Cancellation**: no new page starts once a run is cancelled
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use placecrawl::prelude::*;
//!
//! let config = CrawlerConfig::from_env()?;
//! let launcher = CrawlLauncher::from_config(&config)?;
//! let (sink, mut events) = ChannelEventSink::channel(32);
//!
//! let handle = launcher.start(CrawlRequest::new("https://example.com/venues"), Arc::new(sink));
//! while let Some(event) = events.recv().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! let summary = handle.join().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod errors;
pub mod events;
pub mod extraction;
pub mod fetch;
pub mod geocoding;
pub mod observability;
pub mod pipeline;
pub mod retry;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{
        ApiKey, CompletionConfig, CrawlerConfig, FetchConfig, GeocodingConfig,
    };
    pub use crate::errors::{CrawlError, Result};
    pub use crate::events::{
        ChannelEventSink, CollectingEventSink, CrawlEvent, EventSink, LoggingEventSink,
        NoOpEventSink, StopReason,
    };
    pub use crate::extraction::{AddressExtractor, CompletionService, ExtractedAddress};
    pub use crate::fetch::{PageDocument, PageFetcher, PageParser};
    pub use crate::geocoding::{GeoPoint, Geocoder, LatLon};
    pub use crate::observability::{init_tracing, MetricsSnapshot};
    pub use crate::pipeline::{
        CrawlLauncher, CrawlRequest, PageResult, PaginationPipeline, RunHandle, RunSummary,
    };
    pub use crate::retry::RetryConfig;
    pub use std::sync::Arc;
}
