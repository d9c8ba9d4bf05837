//! Outbound crawl events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::MetricsSnapshot;
use crate::pipeline::PageResult;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The last page had no next link.
    NoNextLink,
    /// `max_pages` pages were emitted.
    PageBudgetExhausted,
    /// A page could not be fetched.
    FetchFailed,
    /// A page's extraction reply could not be used.
    ExtractionFailed,
    /// The run was cancelled before the next page.
    Cancelled,
    /// The start URL was not an absolute http(s) URL.
    InvalidUrl,
    /// The request asked for an empty page budget.
    InvalidRequest,
}

impl StopReason {
    /// Whether the run ended without a failure.
    #[must_use]
    pub fn is_clean(self) -> bool {
        matches!(self, Self::NoNextLink | Self::PageBudgetExhausted)
    }

    /// Stable string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoNextLink => "no_next_link",
            Self::PageBudgetExhausted => "page_budget_exhausted",
            Self::FetchFailed => "fetch_failed",
            Self::ExtractionFailed => "extraction_failed",
            Self::Cancelled => "cancelled",
            Self::InvalidUrl => "invalid_url",
            Self::InvalidRequest => "invalid_request",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event on a run's outbound stream.
///
/// A run emits zero or more `Page` events followed by exactly one
/// `Finished` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrawlEvent {
    /// Results for one page of the chain.
    Page {
        /// Run identifier.
        run_id: Uuid,
        /// Zero-based position in the chain.
        page_index: usize,
        /// The page URL.
        url: String,
        /// Geocoded results.
        result: PageResult,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
    /// End of the run; nothing follows.
    Finished {
        /// Run identifier.
        run_id: Uuid,
        /// Number of `Page` events emitted.
        pages_emitted: usize,
        /// Why the run ended.
        reason: StopReason,
        /// The error that ended the run, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Counters for the run.
        metrics: MetricsSnapshot,
        /// Emission time.
        timestamp: DateTime<Utc>,
    },
}

impl CrawlEvent {
    /// The run this event belongs to.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::Page { run_id, .. } | Self::Finished { run_id, .. } => *run_id,
        }
    }

    /// Short type name used in logs.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Page { .. } => "page",
            Self::Finished { .. } => "finished",
        }
    }

    /// Whether this is the terminal event.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }

    /// The page result, for `Page` events.
    #[must_use]
    pub fn page_result(&self) -> Option<&PageResult> {
        match self {
            Self::Page { result, .. } => Some(result),
            Self::Finished { .. } => None,
        }
    }

    /// The stop reason, for `Finished` events.
    #[must_use]
    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            Self::Finished { reason, .. } => Some(*reason),
            Self::Page { .. } => None,
        }
    }
}
