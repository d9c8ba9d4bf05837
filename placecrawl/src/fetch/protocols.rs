//! Page fetching protocol.

use async_trait::async_trait;

use super::models::PageDocument;
use crate::errors::Result;

/// Retrieves one page and reduces it to a [`PageDocument`].
///
/// Any error is a hard failure for that page: the pipeline ends the run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`.
    async fn fetch(&self, url: &str) -> Result<PageDocument>;
}
