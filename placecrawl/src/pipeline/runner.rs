//! The page-to-page crawl loop.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{parse_start_url, CrawlRequest, PageResult, RunSummary};
use crate::cancellation::CancellationToken;
use crate::config::CrawlerConfig;
use crate::errors::CrawlError;
use crate::events::{CrawlEvent, EventSink, StopReason};
use crate::extraction::{AddressExtractor, ExtractedAddress};
use crate::fetch::{PageDocument, PageFetcher};
use crate::geocoding::Geocoder;
use crate::observability::{CrawlMetrics, SpanTimer};

/// How long a cancelled run keeps trying to deliver its terminal event.
const FINISHED_GRACE: Duration = Duration::from_millis(500);

/// Why the loop stopped, plus the error behind it.
struct Stop {
    reason: StopReason,
    error: Option<String>,
}

impl Stop {
    fn clean(reason: StopReason) -> Self {
        Self {
            reason,
            error: None,
        }
    }

    fn failed(reason: StopReason, error: &CrawlError) -> Self {
        Self {
            reason,
            error: Some(error.to_string()),
        }
    }
}

fn cancelled_stop(run_id: Uuid, cancel: &CancellationToken) -> Stop {
    let reason = cancel.reason().unwrap_or_else(|| "cancelled".to_string());
    info!(run_id = %run_id, reason = %reason, "Crawl cancelled");
    Stop::failed(StopReason::Cancelled, &CrawlError::Cancelled(reason))
}

/// Delivers the terminal event.
///
/// Waits on the sink until the run is cancelled; after that the sink gets
/// `FINISHED_GRACE` to accept the event before it is dropped.
async fn emit_finished(sink: &dyn EventSink, cancel: &CancellationToken, event: CrawlEvent) {
    if !cancel.is_cancelled() {
        tokio::select! {
            biased;
            () = sink.emit(event.clone()) => return,
            () = cancel.cancelled() => {}
        }
    }
    if tokio::time::timeout(FINISHED_GRACE, sink.emit(event))
        .await
        .is_err()
    {
        warn!(
            grace_ms = FINISHED_GRACE.as_millis(),
            "Event sink did not accept the terminal event"
        );
    }
}

/// Per-page failure that ends a run.
enum PageFailure {
    Fetch(CrawlError),
    Extraction(CrawlError),
    Cancelled,
}

/// Drives fetch, extract and geocode across a linear chain of pages.
///
/// Pages are strictly sequential. Geocoding within a page runs with bounded
/// concurrency and is re-joined in extraction order. The pipeline holds no
/// per-run state, so one instance serves any number of concurrent runs.
pub struct PaginationPipeline {
    fetcher: Arc<dyn PageFetcher>,
    extractor: AddressExtractor,
    geocoder: Arc<dyn Geocoder>,
    max_pages: usize,
    geocode_concurrency: usize,
}

impl PaginationPipeline {
    /// Creates a pipeline over its three collaborators.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: AddressExtractor,
        geocoder: Arc<dyn Geocoder>,
        config: &CrawlerConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            geocoder,
            max_pages: config.max_pages,
            geocode_concurrency: config.geocode_concurrency.max(1),
        }
    }

    /// Sets the default page budget.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the per-page geocoding concurrency.
    #[must_use]
    pub fn with_geocode_concurrency(mut self, concurrency: usize) -> Self {
        self.geocode_concurrency = concurrency.max(1);
        self
    }

    /// Default page budget.
    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Runs one crawl to completion.
    ///
    /// Emits one `Page` event per processed page, then exactly one
    /// `Finished` event. Never returns early without the terminal event.
    pub async fn run(
        &self,
        request: &CrawlRequest,
        run_id: Uuid,
        cancel: &CancellationToken,
        sink: &dyn EventSink,
    ) -> RunSummary {
        let timer = SpanTimer::start("crawl");
        let metrics = CrawlMetrics::new();
        let mut pages_emitted = 0;

        info!(run_id = %run_id, url = %request.url, max_pages = ?request.max_pages, "Crawl started");

        let stop = match (parse_start_url(&request.url), request.page_budget(self.max_pages)) {
            (Err(e), _) => {
                warn!(run_id = %run_id, error = %e, "Rejected start URL");
                Stop::failed(StopReason::InvalidUrl, &e)
            }
            (Ok(_), Err(e)) => {
                warn!(run_id = %run_id, error = %e, "Rejected page budget");
                Stop::failed(StopReason::InvalidRequest, &e)
            }
            (Ok(_), Ok(max_pages)) => {
                self.walk(
                    request.url.trim().to_string(),
                    max_pages,
                    run_id,
                    cancel,
                    sink,
                    &metrics,
                    &mut pages_emitted,
                )
                .await
            }
        };

        let snapshot = metrics.snapshot();
        emit_finished(
            sink,
            cancel,
            CrawlEvent::Finished {
                run_id,
                pages_emitted,
                reason: stop.reason,
                error: stop.error.clone(),
                metrics: snapshot,
                timestamp: Utc::now(),
            },
        )
        .await;

        let duration_ms = timer.finish();
        info!(
            run_id = %run_id,
            pages = pages_emitted,
            reason = %stop.reason,
            geocoded = snapshot.addresses_geocoded,
            misses = snapshot.geocode_misses,
            duration_ms,
            "Crawl finished"
        );

        RunSummary {
            run_id,
            pages_emitted,
            reason: stop.reason,
            error: stop.error,
            metrics: snapshot,
            duration_ms,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn walk(
        &self,
        start: String,
        max_pages: usize,
        run_id: Uuid,
        cancel: &CancellationToken,
        sink: &dyn EventSink,
        metrics: &CrawlMetrics,
        pages_emitted: &mut usize,
    ) -> Stop {
        let mut url = start;
        let mut page_index = 0;

        while page_index < max_pages {
            if sink.is_closed() {
                cancel.cancel("event receiver closed");
            }
            if cancel.is_cancelled() {
                return cancelled_stop(run_id, cancel);
            }

            let page = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(PageFailure::Cancelled),
                outcome = self.process_page(&url, metrics) => outcome,
            };

            let (document, result) = match page {
                Ok(page) => page,
                Err(PageFailure::Fetch(e)) => {
                    warn!(run_id = %run_id, page_index, url = %url, error = %e, "Page fetch failed");
                    return Stop::failed(StopReason::FetchFailed, &e);
                }
                Err(PageFailure::Extraction(e)) => {
                    warn!(
                        run_id = %run_id,
                        page_index,
                        url = %url,
                        error_kind = e.kind(),
                        error = %e,
                        "Address extraction failed"
                    );
                    return Stop::failed(StopReason::ExtractionFailed, &e);
                }
                Err(PageFailure::Cancelled) => return cancelled_stop(run_id, cancel),
            };

            info!(
                run_id = %run_id,
                page_index,
                url = %url,
                addresses = result.len(),
                has_next = document.has_next(),
                "Page processed"
            );
            let event = CrawlEvent::Page {
                run_id,
                page_index,
                url: url.clone(),
                result,
                timestamp: Utc::now(),
            };
            // A consumer that stops reading must not pin the run.
            tokio::select! {
                biased;
                () = cancel.cancelled() => return cancelled_stop(run_id, cancel),
                () = sink.emit(event) => {}
            }
            metrics.record_page();
            *pages_emitted += 1;

            match document.next_url {
                Some(next) => url = next,
                None => return Stop::clean(StopReason::NoNextLink),
            }
            page_index += 1;
        }

        Stop::clean(StopReason::PageBudgetExhausted)
    }

    async fn process_page(
        &self,
        url: &str,
        metrics: &CrawlMetrics,
    ) -> Result<(PageDocument, PageResult), PageFailure> {
        let document = self.fetcher.fetch(url).await.map_err(PageFailure::Fetch)?;

        let outcome = self
            .extractor
            .extract_detailed(&document.text)
            .await
            .map_err(PageFailure::Extraction)?;
        metrics.record_extracted(outcome.addresses.len());
        if outcome.repaired {
            metrics.record_repair();
        }
        if outcome.truncated {
            metrics.record_truncation();
        }

        let result = self.geocode_page(outcome.addresses, metrics).await;
        Ok((document, result))
    }

    /// Geocodes a page's records, keeping successes in extraction order.
    pub async fn geocode_page(
        &self,
        extracted: Vec<ExtractedAddress>,
        metrics: &CrawlMetrics,
    ) -> PageResult {
        let resolved: Vec<_> = stream::iter(extracted)
            .map(|item| async move {
                let location = self.geocoder.geocode(&item.address).await;
                (item, location)
            })
            .buffered(self.geocode_concurrency)
            .collect()
            .await;

        let mut result = PageResult::default();
        for (item, location) in resolved {
            match location {
                Some(point) => {
                    metrics.record_geocoded();
                    result.push(item.address, point.titled(item.title));
                }
                None => {
                    metrics.record_geocode_miss();
                    debug!(address = %item.address, "Dropping unresolved address");
                }
            }
        }
        result
    }
}

impl std::fmt::Debug for PaginationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationPipeline")
            .field("extractor", &self.extractor)
            .field("max_pages", &self.max_pages)
            .field("geocode_concurrency", &self.geocode_concurrency)
            .finish_non_exhaustive()
    }
}
