//! Outbound event stream for crawl runs.
//!
//! The pipeline writes [`CrawlEvent`]s to an [`EventSink`]; the transport
//! behind the sink (a channel, a log, a test buffer) is the caller's choice.

mod models;
mod sink;

pub use models::{CrawlEvent, StopReason};
pub use sink::{ChannelEventSink, CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
