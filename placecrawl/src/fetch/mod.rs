//! Page fetching and text reduction.
//!
//! This module provides:
//! - The [`PageDocument`] model
//! - HTML reduction to visible text plus a next-page link
//! - The [`PageFetcher`] protocol and its HTTP implementation

mod html;
#[cfg(feature = "http")]
mod http;
mod models;
mod protocols;

pub use html::{resolve_link, PageParser};
#[cfg(feature = "http")]
pub use http::{build_http_client, HttpPageFetcher};
pub use models::PageDocument;
pub use protocols::PageFetcher;

#[cfg(test)]
pub use protocols::MockPageFetcher;
