//! Scenario tests for complete crawl runs.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::config::{CompletionConfig, CrawlerConfig};
    use crate::errors::CrawlError;
    use crate::events::{ChannelEventSink, CollectingEventSink, CrawlEvent, EventSink, StopReason};
    use crate::extraction::AddressExtractor;
    use crate::fetch::{MockPageFetcher, PageDocument, PageFetcher};
    use crate::geocoding::MockGeocoder;
    use crate::pipeline::{CrawlLauncher, CrawlRequest, PaginationPipeline, RunSummary};
    use crate::testing::{
        reply_for, scripted_pipeline, FakePageChain, ScriptedCompletion, TableGeocoder,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    async fn run_to_end(
        pipeline: &PaginationPipeline,
        request: CrawlRequest,
    ) -> (RunSummary, Vec<CrawlEvent>) {
        let sink = CollectingEventSink::new();
        let summary = pipeline
            .run(&request, Uuid::new_v4(), &CancellationToken::new(), &sink)
            .await;
        (summary, sink.events())
    }

    fn start_request() -> CrawlRequest {
        CrawlRequest::new(FakePageChain::page_url(0))
    }

    fn assert_single_terminal(events: &[CrawlEvent]) {
        let finished = events.iter().filter(|e| e.is_finished()).count();
        assert_eq!(finished, 1, "exactly one terminal event");
        assert!(events.last().is_some_and(CrawlEvent::is_finished));
    }

    fn page_indices(events: &[CrawlEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                CrawlEvent::Page { page_index, .. } => Some(*page_index),
                CrawlEvent::Finished { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_page_budget_stops_long_chain() {
        let pages = Arc::new(FakePageChain::linear(5));
        let pipeline = scripted_pipeline(
            Arc::clone(&pages),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );

        let (summary, events) = run_to_end(&pipeline, start_request().with_max_pages(3)).await;

        assert_eq!(page_indices(&events), vec![0, 1, 2]);
        assert_single_terminal(&events);
        assert_eq!(summary.reason, StopReason::PageBudgetExhausted);
        assert_eq!(summary.pages_emitted, 3);
        assert_eq!(pages.fetched().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_next_link_stops_after_one_page() {
        let pages = Arc::new(FakePageChain::linear(1));
        let pipeline = scripted_pipeline(
            pages,
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );

        let (summary, events) = run_to_end(&pipeline, start_request()).await;

        assert_eq!(page_indices(&events), vec![0]);
        assert_single_terminal(&events);
        assert_eq!(summary.reason, StopReason::NoNextLink);
        assert!(summary.is_clean());
    }

    #[tokio::test]
    async fn test_chain_shorter_than_budget_ends_on_last_page() {
        let pipeline = scripted_pipeline(
            Arc::new(FakePageChain::linear(4)),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );

        let (summary, events) = run_to_end(&pipeline, start_request()).await;

        assert_eq!(page_indices(&events), vec![0, 1, 2, 3]);
        assert_eq!(summary.reason, StopReason::NoNextLink);
    }

    #[tokio::test]
    async fn test_fetch_failure_on_second_page() {
        let pages = Arc::new(FakePageChain::linear(5).failing_at(1, 503));
        let pipeline = scripted_pipeline(
            Arc::clone(&pages),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );

        let (summary, events) = run_to_end(&pipeline, start_request()).await;

        assert_eq!(events.len(), 2);
        assert_eq!(page_indices(&events), vec![0]);
        assert_single_terminal(&events);
        assert_eq!(summary.reason, StopReason::FetchFailed);
        assert_eq!(
            summary.error.as_deref(),
            Some("Fetch failed for https://listings.test/page/1: HTTP 503")
        );
        assert_eq!(pages.fetched().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_geocode_is_dropped_from_both_lists() {
        let completion = ScriptedCompletion::default().reply_when(
            "page 0.",
            reply_for(&[
                ("Cafe", "Hauptstr. 1, Berlin"),
                ("Nowhere", "Unknown Rd 9"),
                ("Museum", "Ring 2, Wien"),
            ]),
        );
        let geocoder = TableGeocoder::new()
            .with("Hauptstr. 1, Berlin", 52.52, 13.40)
            .with("Ring 2, Wien", 48.20, 16.37);
        let pipeline = scripted_pipeline(
            Arc::new(FakePageChain::linear(1)),
            Arc::new(completion),
            Arc::new(geocoder),
        );

        let (summary, events) = run_to_end(&pipeline, start_request()).await;

        let result = events[0].page_result().cloned().unwrap_or_default();
        assert_eq!(result.addresses, vec!["Hauptstr. 1, Berlin", "Ring 2, Wien"]);
        assert_eq!(result.locations.len(), 2);
        assert_eq!(result.locations[0].title, "Cafe");
        assert_eq!((result.locations[0].lat, result.locations[0].lon), (52.52, 13.40));
        assert_eq!(result.locations[1].title, "Museum");
        assert_eq!(summary.metrics.addresses_extracted, 3);
        assert_eq!(summary.metrics.addresses_geocoded, 2);
        assert_eq!(summary.metrics.geocode_misses, 1);
    }

    #[tokio::test]
    async fn test_concurrent_geocoding_keeps_extraction_order() {
        let completion = ScriptedCompletion::default().reply_when(
            "page 0.",
            reply_for(&[("A", "addr-a"), ("B", "addr-b"), ("C", "addr-c")]),
        );
        let geocoder = TableGeocoder::new()
            .with("addr-a", 1.0, 1.0)
            .with("addr-b", 2.0, 2.0)
            .with("addr-c", 3.0, 3.0)
            .with_delay("addr-a", Duration::from_millis(60))
            .with_delay("addr-b", Duration::from_millis(30));
        let pipeline = scripted_pipeline(
            Arc::new(FakePageChain::linear(1)),
            Arc::new(completion),
            Arc::new(geocoder),
        )
        .with_geocode_concurrency(3);

        let (_, events) = run_to_end(&pipeline, start_request()).await;

        let result = events[0].page_result().cloned().unwrap_or_default();
        assert_eq!(result.addresses, vec!["addr-a", "addr-b", "addr-c"]);
        let titles: Vec<_> = result.locations.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_page_without_addresses_still_emits() {
        let geocoder = Arc::new(TableGeocoder::new());
        let pipeline = scripted_pipeline(
            Arc::new(FakePageChain::linear(2)),
            Arc::new(ScriptedCompletion::default()),
            Arc::clone(&geocoder),
        );

        let (_, events) = run_to_end(&pipeline, start_request()).await;

        assert_eq!(page_indices(&events), vec![0, 1]);
        assert!(events[0].page_result().is_some_and(|r| r.is_empty()));
        assert!(geocoder.queries().is_empty());
    }

    #[tokio::test]
    async fn test_extraction_failure_ends_run_after_prior_pages() {
        let completion = ScriptedCompletion::default()
            .reply_when("page 1.", "I could not find any addresses, sorry: {\"x\": 1}");
        let pipeline = scripted_pipeline(
            Arc::new(FakePageChain::linear(5)),
            Arc::new(completion),
            Arc::new(TableGeocoder::new()),
        );

        let (summary, events) = run_to_end(&pipeline, start_request()).await;

        assert_eq!(page_indices(&events), vec![0]);
        assert_single_terminal(&events);
        assert_eq!(summary.reason, StopReason::ExtractionFailed);
        assert!(summary.error.is_some());
    }

    #[tokio::test]
    async fn test_completion_service_error_ends_run() {
        let completion = ScriptedCompletion::default()
            .fail_when("page 0.", CrawlError::Completion("HTTP 401".into()));
        let pipeline = scripted_pipeline(
            Arc::new(FakePageChain::linear(3)),
            Arc::new(completion),
            Arc::new(TableGeocoder::new()),
        );

        let (summary, events) = run_to_end(&pipeline, start_request()).await;

        assert_eq!(events.len(), 1);
        assert_eq!(summary.reason, StopReason::ExtractionFailed);
        assert_eq!(summary.pages_emitted, 0);
    }

    #[tokio::test]
    async fn test_truncated_reply_is_repaired_and_counted() {
        let completion = ScriptedCompletion::default().reply_when(
            "page 0.",
            r#"[{"title":"A","address":"addr-a"},{"title":"B","addr"#,
        );
        let geocoder = TableGeocoder::new().with("addr-a", 1.0, 2.0);
        let pipeline = scripted_pipeline(
            Arc::new(FakePageChain::linear(1)),
            Arc::new(completion),
            Arc::new(geocoder),
        );

        let (summary, events) = run_to_end(&pipeline, start_request()).await;

        let result = events[0].page_result().cloned().unwrap_or_default();
        assert_eq!(result.addresses, vec!["addr-a"]);
        assert_eq!(summary.metrics.json_repairs, 1);
        assert_eq!(summary.metrics.pages_processed, 1);
    }

    #[tokio::test]
    async fn test_invalid_start_url_emits_only_terminal_event() {
        let pages = Arc::new(FakePageChain::linear(1));
        let pipeline = scripted_pipeline(
            Arc::clone(&pages),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );

        let (summary, events) = run_to_end(&pipeline, CrawlRequest::new("not a url")).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stop_reason(), Some(StopReason::InvalidUrl));
        assert_eq!(summary.pages_emitted, 0);
        assert!(pages.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_fetches_nothing() {
        let pages = Arc::new(FakePageChain::linear(3));
        let pipeline = scripted_pipeline(
            Arc::clone(&pages),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );
        let cancel = CancellationToken::new();
        cancel.cancel("client left");
        let sink = CollectingEventSink::new();

        let summary = pipeline
            .run(&start_request(), Uuid::new_v4(), &cancel, &sink)
            .await;

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.error.as_deref(), Some("Crawl cancelled: client left"));
        assert!(pages.fetched().is_empty());
        assert_single_terminal(&sink.events());
    }

    #[tokio::test]
    async fn test_launcher_cancel_stops_before_next_page() {
        let pages = Arc::new(FakePageChain::linear(5).with_delay(Duration::from_millis(50)));
        let pipeline = scripted_pipeline(
            Arc::clone(&pages),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );
        let launcher = CrawlLauncher::new(Arc::new(pipeline));
        let (sink, mut rx) = ChannelEventSink::channel(16);

        let handle = launcher.start(start_request(), Arc::new(sink));
        let run_id = handle.run_id();

        let first = rx.recv().await;
        assert!(matches!(first, Some(CrawlEvent::Page { page_index: 0, .. })));
        handle.cancel("user request");
        let fetched_at_cancel = pages.fetched().len();
        let summary = handle.join().await.unwrap();

        assert_eq!(summary.run_id, run_id);
        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(pages.fetched().len(), fetched_at_cancel);
        assert!(fetched_at_cancel <= 2);
        assert_eq!(summary.pages_emitted, 1);

        let mut rest = Vec::new();
        while let Some(event) = rx.recv().await {
            rest.push(event);
        }
        assert!(rest.last().is_some_and(CrawlEvent::is_finished));
        assert!(rest.iter().all(|e| e.run_id() == run_id));
    }

    #[tokio::test]
    async fn test_closed_receiver_cancels_run() {
        let pages = Arc::new(FakePageChain::linear(5).with_delay(Duration::from_millis(20)));
        let pipeline = scripted_pipeline(
            Arc::clone(&pages),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );
        let launcher = CrawlLauncher::new(Arc::new(pipeline));
        let (sink, rx) = ChannelEventSink::channel(1);
        drop(rx);

        let summary = launcher
            .start(start_request(), Arc::new(sink))
            .join()
            .await
            .unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert!(pages.fetched().len() <= 1);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_independent() {
        let pipeline = scripted_pipeline(
            Arc::new(FakePageChain::linear(3)),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );
        let launcher = CrawlLauncher::new(Arc::new(pipeline));
        let first_sink = Arc::new(CollectingEventSink::new());
        let second_sink = Arc::new(CollectingEventSink::new());

        let first = launcher.start(start_request().with_max_pages(1), first_sink.clone());
        let second = launcher.start(start_request(), second_sink.clone());
        assert_ne!(first.run_id(), second.run_id());

        let first = first.join().await.unwrap();
        let second = second.join().await.unwrap();

        assert_eq!(first.pages_emitted, 1);
        assert_eq!(first.reason, StopReason::PageBudgetExhausted);
        assert_eq!(second.pages_emitted, 3);
        assert_eq!(second.metrics.pages_processed, 3);
        assert!(first_sink.events().iter().all(|e| e.run_id() == first.run_id));
        assert!(second_sink.events().iter().all(|e| e.run_id() == second.run_id));
    }

    #[tokio::test]
    async fn test_empty_extraction_never_calls_geocoder() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(PageDocument::new("No places here.", None)));
        let mut geocoder = MockGeocoder::new();
        geocoder.expect_geocode().never();

        let extractor = AddressExtractor::new(
            Arc::new(ScriptedCompletion::default()),
            &CompletionConfig::default(),
        );
        let pipeline = PaginationPipeline::new(
            Arc::new(fetcher),
            extractor,
            Arc::new(geocoder),
            &CrawlerConfig::default(),
        );

        let (summary, events) = run_to_end(&pipeline, CrawlRequest::new("https://a.test/")).await;

        assert_eq!(events.len(), 2);
        assert_eq!(summary.reason, StopReason::NoNextLink);
    }

    #[tokio::test]
    async fn test_sink_trait_object_receives_events() {
        let pipeline = scripted_pipeline(
            Arc::new(FakePageChain::linear(2)),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );
        let sink: Arc<dyn EventSink> = Arc::new(CollectingEventSink::new());

        let summary = pipeline
            .run(&start_request(), Uuid::new_v4(), &CancellationToken::new(), sink.as_ref())
            .await;

        assert_eq!(summary.pages_emitted, 2);
        assert!(!sink.is_closed());
    }

    #[tokio::test]
    async fn test_cancel_releases_run_blocked_on_full_sink() {
        let pages = Arc::new(FakePageChain::linear(5));
        let pipeline = scripted_pipeline(
            Arc::clone(&pages),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );
        let launcher = CrawlLauncher::new(Arc::new(pipeline));
        let (sink, mut rx) = ChannelEventSink::channel(1);

        let handle = launcher.start(start_request(), Arc::new(sink));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel("consumer stalled");
        let fetched_at_cancel = pages.fetched().len();

        let summary = tokio::time::timeout(Duration::from_secs(2), handle.join())
            .await
            .expect("run ends after cancel")
            .unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.pages_emitted, 1);
        assert_eq!(summary.metrics.pages_processed, 1);
        assert_eq!(fetched_at_cancel, 2);
        assert_eq!(pages.fetched().len(), fetched_at_cancel);

        // Only the first page fit in the channel; the terminal event was dropped.
        assert!(matches!(rx.try_recv(), Ok(CrawlEvent::Page { page_index: 0, .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_during_geocoding_emits_no_page() {
        let completion = ScriptedCompletion::default()
            .reply_when("page 0.", reply_for(&[("Slow", "slow-addr")]));
        let geocoder = Arc::new(
            TableGeocoder::new()
                .with("slow-addr", 1.0, 1.0)
                .with_delay("slow-addr", Duration::from_millis(300)),
        );
        let pages = Arc::new(FakePageChain::linear(2));
        let pipeline = scripted_pipeline(
            Arc::clone(&pages),
            Arc::new(completion),
            Arc::clone(&geocoder),
        );
        let launcher = CrawlLauncher::new(Arc::new(pipeline));
        let (sink, mut rx) = ChannelEventSink::channel(8);

        let handle = launcher.start(start_request(), Arc::new(sink));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(geocoder.queries(), vec!["slow-addr"]);
        handle.cancel("user request");
        let summary = handle.join().await.unwrap();

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.pages_emitted, 0);
        assert_eq!(summary.metrics.addresses_geocoded, 0);
        assert_eq!(pages.fetched().len(), 1);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 1);
        assert_single_terminal(&events);
    }

    #[tokio::test]
    async fn test_zero_page_budget_is_rejected() {
        let pages = Arc::new(FakePageChain::linear(3));
        let pipeline = scripted_pipeline(
            Arc::clone(&pages),
            Arc::new(ScriptedCompletion::default()),
            Arc::new(TableGeocoder::new()),
        );

        let (summary, events) = run_to_end(&pipeline, start_request().with_max_pages(0)).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stop_reason(), Some(StopReason::InvalidRequest));
        assert_eq!(summary.pages_emitted, 0);
        assert!(!summary.is_clean());
        assert!(summary.error.is_some_and(|e| e.contains("max_pages")));
        assert!(pages.fetched().is_empty());
    }

    struct PanickingFetcher;

    #[async_trait::async_trait]
    impl PageFetcher for PanickingFetcher {
        async fn fetch(&self, _url: &str) -> crate::errors::Result<PageDocument> {
            panic!("fetcher exploded")
        }
    }

    #[tokio::test]
    async fn test_panicking_run_reports_internal_error() {
        let extractor = AddressExtractor::new(
            Arc::new(ScriptedCompletion::default()),
            &CompletionConfig::default(),
        );
        let pipeline = PaginationPipeline::new(
            Arc::new(PanickingFetcher),
            extractor,
            Arc::new(TableGeocoder::new()),
            &CrawlerConfig::default(),
        );
        let launcher = CrawlLauncher::new(Arc::new(pipeline));

        let err = launcher
            .start(CrawlRequest::new("https://a.test/"), Arc::new(CollectingEventSink::new()))
            .join()
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::Internal(_)));
        assert_eq!(err.kind(), "internal");
    }
}
