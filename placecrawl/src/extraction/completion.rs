//! Text-completion service protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// The full prompt, sent as one user message.
    pub prompt: String,
    /// Generation stops before the first occurrence of this sequence.
    pub stop: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens in the reply.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Sum of both.
    #[serde(default)]
    pub total_tokens: u32,
}

/// A completion reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Reply text, stop sequence already removed by the service.
    pub content: String,
    /// Why generation ended (`stop`, `length`, ...).
    pub finish_reason: Option<String>,
    /// Token usage, if reported.
    pub usage: Option<TokenUsage>,
}

impl Completion {
    /// Creates a reply that ended on the stop sequence.
    #[must_use]
    pub fn stopped(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: Some("stop".to_string()),
            usage: None,
        }
    }

    /// Whether the service cut the reply at its own output limit.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

/// A generative text-completion capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Completes `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}
