//! Data model for fetched pages.

use serde::{Deserialize, Serialize};

/// The readable content of one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    /// Visible text, blank-line runs collapsed and trimmed.
    pub text: String,
    /// Absolute URL of the next page in the chain, if one was found.
    #[serde(rename = "nextUrl", skip_serializing_if = "Option::is_none")]
    pub next_url: Option<String>,
}

impl PageDocument {
    /// Creates a page document.
    #[must_use]
    pub fn new(text: impl Into<String>, next_url: Option<String>) -> Self {
        Self {
            text: text.into(),
            next_url,
        }
    }

    /// Whether the chain continues past this page.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_url.is_some()
    }
}
