//! Event sink trait and implementations.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};

use super::models::CrawlEvent;

/// Receives a run's outbound events.
///
/// The pipeline writes to a sink and never knows the transport behind it.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers an event, waiting for capacity if the transport has any.
    async fn emit(&self, event: CrawlEvent);

    /// Delivers an event without waiting.
    ///
    /// Never fails. Events that cannot be delivered are logged and dropped.
    fn try_emit(&self, event: CrawlEvent);

    /// Whether the consumer has gone away.
    ///
    /// A closed sink is a cancellation signal for the run writing to it.
    fn is_closed(&self) -> bool {
        false
    }
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: CrawlEvent) {}

    fn try_emit(&self, _event: CrawlEvent) {}
}

/// A sink that logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &CrawlEvent) {
        let data = serde_json::to_string(event).unwrap_or_default();
        if self.level == Level::DEBUG {
            debug!(run_id = %event.run_id(), event_type = event.event_type(), event_data = %data, "Crawl event");
        } else {
            info!(run_id = %event.run_id(), event_type = event.event_type(), event_data = %data, "Crawl event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: CrawlEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: CrawlEvent) {
        self.log_event(&event);
    }
}

/// A sink that forwards events into a tokio mpsc channel.
///
/// Once a send fails because the receiver was dropped, the sink reports
/// itself closed.
#[derive(Debug)]
pub struct ChannelEventSink {
    sender: mpsc::Sender<CrawlEvent>,
    closed: AtomicBool,
}

impl ChannelEventSink {
    /// Wraps an existing sender.
    #[must_use]
    pub fn new(sender: mpsc::Sender<CrawlEvent>) -> Self {
        Self {
            sender,
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a sink and the receiver it feeds.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CrawlEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }

    fn mark_closed(&self, event: &CrawlEvent) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            warn!(
                run_id = %event.run_id(),
                event_type = event.event_type(),
                "Event receiver closed"
            );
        }
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: CrawlEvent) {
        if let Err(mpsc::error::SendError(event)) = self.sender.send(event).await {
            self.mark_closed(&event);
        }
    }

    fn try_emit(&self, event: CrawlEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    run_id = %event.run_id(),
                    event_type = event.event_type(),
                    "Event channel full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => self.mark_closed(&event),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.sender.is_closed()
    }
}

/// A sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<CrawlEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns the `Page` events only.
    #[must_use]
    pub fn page_events(&self) -> Vec<CrawlEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| !e.is_finished())
            .cloned()
            .collect()
    }

    /// Returns the last event, if any.
    #[must_use]
    pub fn last(&self) -> Option<CrawlEvent> {
        self.events.read().last().cloned()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: CrawlEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: CrawlEvent) {
        self.events.write().push(event);
    }
}
