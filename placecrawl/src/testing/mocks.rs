//! Scripted stand-ins for the upstream services.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::{CrawlError, Result};
use crate::extraction::{Completion, CompletionRequest, CompletionService, ExtractedAddress};
use crate::fetch::{PageDocument, PageFetcher};
use crate::geocoding::{Geocoder, LatLon};

/// Base URL of the pages produced by [`FakePageChain::linear`].
pub const CHAIN_BASE: &str = "https://listings.test/page";

/// A linked chain of in-memory pages.
#[derive(Debug, Default)]
pub struct FakePageChain {
    pages: HashMap<String, Result<PageDocument>>,
    delay: Option<Duration>,
    fetched: Mutex<Vec<String>>,
}

impl FakePageChain {
    /// Creates an empty chain; every fetch fails with 404.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// URL of page `index` in a linear chain.
    #[must_use]
    pub fn page_url(index: usize) -> String {
        format!("{CHAIN_BASE}/{index}")
    }

    /// Text of page `index` in a linear chain.
    #[must_use]
    pub fn page_text(index: usize) -> String {
        format!("Listing page {index}.")
    }

    /// `count` pages, each linking to the next; the last has no link.
    #[must_use]
    pub fn linear(count: usize) -> Self {
        let mut chain = Self::new();
        for index in 0..count {
            let next = (index + 1 < count).then(|| Self::page_url(index + 1));
            chain = chain.with_page(
                Self::page_url(index),
                PageDocument::new(Self::page_text(index), next),
            );
        }
        chain
    }

    /// Adds or replaces a page.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, document: PageDocument) -> Self {
        self.pages.insert(url.into(), Ok(document));
        self
    }

    /// Makes page `index` of a linear chain fail with an HTTP status.
    #[must_use]
    pub fn failing_at(mut self, index: usize, status: u16) -> Self {
        let url = Self::page_url(index);
        let error = CrawlError::fetch(&url, status);
        self.pages.insert(url, Err(error));
        self
    }

    /// Waits before answering each fetch.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs fetched so far, in order.
    #[must_use]
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl PageFetcher for FakePageChain {
    async fn fetch(&self, url: &str) -> Result<PageDocument> {
        self.fetched.lock().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(CrawlError::fetch(url, 404)))
    }
}

/// Canned completion replies keyed by a substring of the prompt.
///
/// Replies are given without the trailing stop sequence, as a real
/// service returns them.
#[derive(Debug)]
pub struct ScriptedCompletion {
    rules: Vec<(String, Result<Completion>)>,
    fallback: String,
    calls: AtomicUsize,
}

impl Default for ScriptedCompletion {
    fn default() -> Self {
        Self::new("[")
    }
}

impl ScriptedCompletion {
    /// Creates a script whose unmatched prompts get `fallback`.
    #[must_use]
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replies with `content` when the prompt contains `needle`.
    #[must_use]
    pub fn reply_when(mut self, needle: impl Into<String>, content: impl Into<String>) -> Self {
        self.rules
            .push((needle.into(), Ok(Completion::stopped(content))));
        self
    }

    /// Fails with `error` when the prompt contains `needle`.
    #[must_use]
    pub fn fail_when(mut self, needle: impl Into<String>, error: CrawlError) -> Self {
        self.rules.push((needle.into(), Err(error)));
        self
    }

    /// Number of completions served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map_or_else(
                || Ok(Completion::stopped(self.fallback.clone())),
                |(_, reply)| reply.clone(),
            )
    }
}

/// Builds a reply body listing `(title, address)` records, without the
/// closing bracket.
#[must_use]
pub fn reply_for(records: &[(&str, &str)]) -> String {
    let items: Vec<String> = records
        .iter()
        .map(|(title, address)| {
            serde_json::to_string(&ExtractedAddress::new(*title, *address)).unwrap_or_default()
        })
        .collect();
    format!("[{}", items.join(","))
}

/// Geocoder answering from a fixed address table.
#[derive(Debug, Default)]
pub struct TableGeocoder {
    table: HashMap<String, LatLon>,
    delays: HashMap<String, Duration>,
    queries: Mutex<Vec<String>>,
}

impl TableGeocoder {
    /// Creates an empty table; every lookup misses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `address` to `(lat, lon)`.
    #[must_use]
    pub fn with(mut self, address: impl Into<String>, lat: f64, lon: f64) -> Self {
        self.table.insert(address.into(), LatLon::new(lat, lon));
        self
    }

    /// Delays the answer for `address`.
    #[must_use]
    pub fn with_delay(mut self, address: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(address.into(), delay);
        self
    }

    /// Addresses looked up so far, in call order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl Geocoder for TableGeocoder {
    async fn geocode(&self, address: &str) -> Option<LatLon> {
        self.queries.lock().push(address.to_string());
        if let Some(delay) = self.delays.get(address) {
            tokio::time::sleep(*delay).await;
        }
        self.table.get(address).copied()
    }
}
