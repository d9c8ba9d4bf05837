//! `reqwest`-backed page fetcher.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::html::PageParser;
use super::models::PageDocument;
use super::protocols::PageFetcher;
use crate::config::FetchConfig;
use crate::errors::{CrawlError, Result};
use crate::observability::SpanTimer;
use crate::retry::with_retry;

/// Builds the HTTP client shared by every upstream adapter.
pub fn build_http_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| CrawlError::Config(format!("failed to build HTTP client: {e}")))
}

/// Fetches pages over HTTP with one GET per attempt.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
    config: FetchConfig,
    parser: PageParser,
}

impl HttpPageFetcher {
    /// Creates a fetcher with its own client.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = build_http_client(&config.user_agent)?;
        Self::with_client(client, config)
    }

    /// Creates a fetcher on a shared client.
    pub fn with_client(client: reqwest::Client, config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client,
            config: config.clone(),
            parser: PageParser::new()?,
        })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(|e| CrawlError::transport(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::fetch(url, status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| CrawlError::transport(url, e.to_string()))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<PageDocument> {
        let timer = SpanTimer::start("fetch");
        let body = with_retry(&self.config.retry, url, CrawlError::is_transient, || {
            self.fetch_body(url)
        })
        .await
        .map_err(|e| {
            warn!(url, error = %e, "Page fetch failed");
            e
        })?;

        let doc = self.parser.parse(&body, url);
        debug!(
            url,
            duration_ms = timer.finish(),
            text_len = doc.text.len(),
            next_url = doc.next_url.as_deref(),
            "Fetched page"
        );
        Ok(doc)
    }
}
