//! Address extraction from page text.

use std::sync::Arc;
use tracing::{debug, info};

use super::completion::{CompletionRequest, CompletionService};
use super::models::{ExtractedAddress, ExtractionOutcome};
use super::prompt::build_prompt;
use super::repair::{needs_repair, repair_json};
use crate::config::CompletionConfig;
use crate::errors::{CrawlError, Result};

/// Pulls `{title, address}` records out of unstructured page text.
///
/// The request stops at the first `]` the model emits, which keeps replies
/// short and cheap. The service may still cut a reply at its own output
/// limit before reaching the stop sequence, so every reply is closed and
/// repaired before parsing; a cut-off trailing record is lost. Parse
/// failures after repair are errors. A reply of `[]` is a success with no
/// addresses.
#[derive(Clone)]
pub struct AddressExtractor {
    service: Arc<dyn CompletionService>,
    max_input_chars: usize,
    stop: String,
    temperature: f32,
}

impl AddressExtractor {
    /// Creates an extractor over a completion service.
    #[must_use]
    pub fn new(service: Arc<dyn CompletionService>, config: &CompletionConfig) -> Self {
        Self {
            service,
            max_input_chars: config.max_input_chars,
            stop: config.stop.clone(),
            temperature: config.temperature,
        }
    }

    /// Extracts addresses from `text`, in reply order.
    pub async fn extract(&self, text: &str) -> Result<Vec<ExtractedAddress>> {
        Ok(self.extract_detailed(text).await?.addresses)
    }

    /// Extracts addresses and reports repair and truncation diagnostics.
    pub async fn extract_detailed(&self, text: &str) -> Result<ExtractionOutcome> {
        let request = CompletionRequest {
            prompt: build_prompt(text, self.max_input_chars),
            stop: self.stop.clone(),
            temperature: self.temperature,
        };

        let completion = self.service.complete(&request).await?;
        if let Some(usage) = completion.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Completion usage"
            );
        }

        // The service strips the stop sequence; put it back to close the array.
        let closed = format!("{}{}", completion.content.trim(), self.stop);
        let repaired = needs_repair(&closed);
        let json = repair_json(&closed);

        let addresses: Vec<ExtractedAddress> = serde_json::from_str(&json)
            .map_err(|e| CrawlError::extraction_parse(json.clone(), e.to_string()))?;

        debug!(
            count = addresses.len(),
            repaired,
            truncated = completion.is_truncated(),
            "Extracted addresses"
        );

        Ok(ExtractionOutcome {
            addresses,
            repaired,
            truncated: completion.is_truncated(),
            usage: completion.usage,
        })
    }
}

impl std::fmt::Debug for AddressExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressExtractor")
            .field("max_input_chars", &self.max_input_chars)
            .field("stop", &self.stop)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}
