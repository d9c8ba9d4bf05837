//! Per-run counters.
//!
//! Dropped addresses are policy, not errors, so they are counted here
//! instead of being surfaced to the consumer as failures.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters for one crawl run.
#[derive(Debug, Default)]
pub struct CrawlMetrics {
    pages_processed: AtomicU64,
    addresses_extracted: AtomicU64,
    addresses_geocoded: AtomicU64,
    geocode_misses: AtomicU64,
    json_repairs: AtomicU64,
    reply_truncations: AtomicU64,
}

impl CrawlMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A page produced a result event.
    pub fn record_page(&self) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// The extractor returned `count` candidates for a page.
    pub fn record_extracted(&self, count: usize) {
        self.addresses_extracted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// An address resolved to coordinates.
    pub fn record_geocoded(&self) {
        self.addresses_geocoded.fetch_add(1, Ordering::Relaxed);
    }

    /// An address could not be resolved and was dropped.
    pub fn record_geocode_miss(&self) {
        self.geocode_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A completion reply needed JSON repair.
    pub fn record_repair(&self) {
        self.json_repairs.fetch_add(1, Ordering::Relaxed);
    }

    /// A completion reply hit the service's output limit.
    pub fn record_truncation(&self) {
        self.reply_truncations.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_processed: self.pages_processed.load(Ordering::Relaxed),
            addresses_extracted: self.addresses_extracted.load(Ordering::Relaxed),
            addresses_geocoded: self.addresses_geocoded.load(Ordering::Relaxed),
            geocode_misses: self.geocode_misses.load(Ordering::Relaxed),
            json_repairs: self.json_repairs.load(Ordering::Relaxed),
            reply_truncations: self.reply_truncations.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of [`CrawlMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Pages that produced a result event.
    pub pages_processed: u64,
    /// Candidates returned by the extraction service.
    pub addresses_extracted: u64,
    /// Candidates resolved to coordinates.
    pub addresses_geocoded: u64,
    /// Candidates dropped because geocoding found nothing.
    pub geocode_misses: u64,
    /// Replies that needed JSON repair.
    pub json_repairs: u64,
    /// Replies cut off by the service's output limit.
    pub reply_truncations: u64,
}
