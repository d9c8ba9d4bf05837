//! Error types for the placecrawl pipeline.
//!
//! Per-page failures (fetch, extraction) end a run cleanly; per-address
//! geocoding misses never surface here and are absorbed by the pipeline.

use thiserror::Error;

/// The main error type for placecrawl operations.
#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    /// The page was fetched but returned a non-success status.
    #[error("Fetch failed for {url}: HTTP {status}")]
    Fetch {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request never produced a response (connect, timeout, body read).
    #[error("Transport error for {url}: {message}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Underlying error message.
        message: String,
    },

    /// The text-completion service rejected the request or returned nothing.
    #[error("Completion service error: {0}")]
    Completion(String),

    /// The completion reply was not a JSON array even after repair.
    #[error("Extraction reply is not valid JSON: {message}")]
    ExtractionParse {
        /// The repaired reply that failed to parse.
        reply: String,
        /// The parser error.
        message: String,
    },

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was cancelled.
    #[error("Crawl cancelled: {0}")]
    Cancelled(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The run task died without producing a summary.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrawlError {
    /// Creates a fetch error.
    #[must_use]
    pub fn fetch(url: impl Into<String>, status: u16) -> Self {
        Self::Fetch {
            url: url.into(),
            status,
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an extraction parse error.
    #[must_use]
    pub fn extraction_parse(reply: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExtractionParse {
            reply: reply.into(),
            message: message.into(),
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Transport failures and HTTP 429/5xx are transient; everything else is not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Fetch { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Stable short code for logs and terminal events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Transport { .. } => "transport",
            Self::Completion(_) => "completion",
            Self::ExtractionParse { .. } => "extraction_parse",
            Self::Config(_) => "config",
            Self::Cancelled(_) => "cancelled",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for CrawlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CrawlError>;
