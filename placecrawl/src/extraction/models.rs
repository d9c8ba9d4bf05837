//! Records produced by address extraction.

use serde::{Deserialize, Serialize};

use super::completion::TokenUsage;

/// One place the extraction service found in page text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedAddress {
    /// Human-readable label for the place.
    #[serde(default)]
    pub title: String,
    /// Free-text postal address.
    #[serde(default)]
    pub address: String,
}

impl ExtractedAddress {
    /// Creates an extracted address.
    #[must_use]
    pub fn new(title: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            address: address.into(),
        }
    }
}

/// Full result of one extraction call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    /// Parsed records, in reply order.
    pub addresses: Vec<ExtractedAddress>,
    /// The reply needed JSON repair before parsing.
    pub repaired: bool,
    /// The service stopped at its output limit rather than the stop sequence.
    pub truncated: bool,
    /// Token usage reported by the service.
    pub usage: Option<TokenUsage>,
}
