//! Address extraction through a text-completion service.
//!
//! This module provides:
//! - The extraction prompt and input truncation
//! - Repair of truncated JSON array replies
//! - The [`CompletionService`] protocol and an Azure OpenAI client
//! - [`AddressExtractor`], which ties them together

#[cfg(feature = "http")]
mod azure;
mod completion;
mod extractor;
mod models;
mod prompt;
mod repair;

#[cfg(feature = "http")]
pub use azure::{parse_chat_response, AzureOpenAiClient};
pub use completion::{Completion, CompletionRequest, CompletionService, TokenUsage};
pub use extractor::AddressExtractor;
pub use models::{ExtractedAddress, ExtractionOutcome};
pub use prompt::{build_prompt, truncate_chars, INPUT_END, INPUT_START};
pub use repair::{needs_repair, repair_json};

#[cfg(test)]
pub use completion::MockCompletionService;
