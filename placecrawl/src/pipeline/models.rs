//! Pipeline inputs and outputs.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::errors::{CrawlError, Result};
use crate::events::StopReason;
use crate::geocoding::GeoPoint;
use crate::observability::MetricsSnapshot;

/// Geocoded results for one page.
///
/// `addresses[i]` and `locations[i]` describe the same extracted record.
/// Records that failed to geocode appear in neither list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// Address strings, in extraction order.
    pub addresses: Vec<String>,
    /// Resolved locations, parallel to `addresses`.
    pub locations: Vec<GeoPoint>,
}

impl PageResult {
    /// Appends one resolved record to both lists.
    pub fn push(&mut self, address: impl Into<String>, location: GeoPoint) {
        self.addresses.push(address.into());
        self.locations.push(location);
    }

    /// Number of resolved records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the page resolved nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// The inbound "start a crawl" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    /// Absolute http(s) URL of the first page.
    pub url: String,
    /// Page budget; falls back to the configured default.
    #[serde(default, rename = "maxPages", alias = "max_pages")]
    pub max_pages: Option<usize>,
}

impl CrawlRequest {
    /// Creates a request with the default page budget.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_pages: None,
        }
    }

    /// Sets the page budget.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Resolves the page budget against a default, rejecting zero.
    pub fn page_budget(&self, default: usize) -> Result<usize> {
        match self.max_pages.unwrap_or(default) {
            0 => Err(CrawlError::Config("max_pages must be at least 1".into())),
            budget => Ok(budget),
        }
    }
}

/// Parses a start URL, accepting only absolute http(s) URLs.
pub fn parse_start_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| CrawlError::Config(format!("invalid start URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CrawlError::Config(format!(
            "unsupported start URL scheme {other:?}"
        ))),
    }
}

/// Outcome of a finished run, mirroring its terminal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: Uuid,
    /// Number of page events emitted.
    pub pages_emitted: usize,
    /// Why the run ended.
    pub reason: StopReason,
    /// The error that ended the run, if any.
    pub error: Option<String>,
    /// Counters for the run.
    pub metrics: MetricsSnapshot,
    /// Wall time of the run.
    pub duration_ms: f64,
}

impl RunSummary {
    /// Whether the run ended without a failure.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.reason.is_clean()
    }
}
