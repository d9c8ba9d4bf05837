//! Starting runs off the caller's task.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};
use uuid::Uuid;

use super::models::{CrawlRequest, RunSummary};
use super::runner::PaginationPipeline;
use crate::cancellation::CancellationToken;
use crate::errors::{CrawlError, Result};
use crate::events::EventSink;

/// Spawns crawl runs on the tokio runtime.
///
/// Every run gets its own identifier, cancellation token and counters;
/// only the pipeline's collaborators are shared.
#[derive(Debug, Clone)]
pub struct CrawlLauncher {
    pipeline: Arc<PaginationPipeline>,
}

impl CrawlLauncher {
    /// Creates a launcher for `pipeline`.
    #[must_use]
    pub fn new(pipeline: Arc<PaginationPipeline>) -> Self {
        Self { pipeline }
    }

    /// Builds the HTTP-backed pipeline described by `config`.
    #[cfg(feature = "http")]
    pub fn from_config(config: &crate::config::CrawlerConfig) -> Result<Self> {
        use crate::extraction::{AddressExtractor, AzureOpenAiClient};
        use crate::fetch::{build_http_client, HttpPageFetcher};
        use crate::geocoding::BingMapsGeocoder;

        config.validate()?;
        let client = build_http_client(&config.fetch.user_agent)?;

        let fetcher = HttpPageFetcher::with_client(client.clone(), &config.fetch)?;
        let completion = AzureOpenAiClient::new(client.clone(), &config.completion);
        let extractor = AddressExtractor::new(Arc::new(completion), &config.completion);
        let geocoder = BingMapsGeocoder::new(client, &config.geocoding);

        let pipeline =
            PaginationPipeline::new(Arc::new(fetcher), extractor, Arc::new(geocoder), config);
        Ok(Self::new(Arc::new(pipeline)))
    }

    /// The shared pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<PaginationPipeline> {
        &self.pipeline
    }

    /// Starts a run and returns immediately.
    ///
    /// Results arrive on `sink`. Must be called from within a tokio runtime.
    pub fn start(&self, request: CrawlRequest, sink: Arc<dyn EventSink>) -> RunHandle {
        let run_id = Uuid::new_v4();
        let cancel = Arc::new(CancellationToken::new());
        let pipeline = Arc::clone(&self.pipeline);
        let token = Arc::clone(&cancel);

        debug!(run_id = %run_id, url = %request.url, "Spawning crawl run");
        let span = tracing::info_span!("crawl", run_id = %run_id);
        let task = tokio::spawn(
            async move { pipeline.run(&request, run_id, &token, sink.as_ref()).await }
                .instrument(span),
        );

        RunHandle {
            run_id,
            cancel,
            task,
        }
    }
}

/// Handle to one in-flight run.
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    cancel: Arc<CancellationToken>,
    task: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// The run identifier carried by every event of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Requests cancellation. No new page starts after this returns.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.cancel.cancel(reason);
    }

    /// The run's cancellation token.
    #[must_use]
    pub fn token(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancel)
    }

    /// Whether the run task has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run to end.
    ///
    /// A run task that panicked reports `CrawlError::Internal`; an aborted
    /// task reports `CrawlError::Cancelled`.
    pub async fn join(self) -> Result<RunSummary> {
        self.task.await.map_err(|e| {
            if e.is_panic() {
                CrawlError::Internal(format!("run task panicked: {e}"))
            } else {
                CrawlError::Cancelled(format!("run task aborted: {e}"))
            }
        })
    }
}
