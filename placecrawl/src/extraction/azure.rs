//! Azure OpenAI chat-completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::completion::{Completion, CompletionRequest, CompletionService, TokenUsage};
use crate::config::CompletionConfig;
use crate::errors::{CrawlError, Result};
use crate::observability::SpanTimer;
use crate::retry::with_retry;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    stop: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    choices: Vec<ChoiceRaw>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceRaw {
    message: MessageRaw,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRaw {
    content: Option<String>,
}

/// Parses a chat-completions response body.
pub fn parse_chat_response(body: &str) -> Result<Completion> {
    let raw: ChatResponseRaw = serde_json::from_str(body)
        .map_err(|e| CrawlError::Completion(format!("malformed response: {e}")))?;

    let choice = raw
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CrawlError::Completion("response has no choices".into()))?;

    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: raw.usage,
    })
}

/// Completion client for one Azure OpenAI deployment.
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    http_client: reqwest::Client,
    config: CompletionConfig,
}

impl AzureOpenAiClient {
    /// Creates a client on a shared HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: &CompletionConfig) -> Self {
        Self {
            http_client,
            config: config.clone(),
        }
    }

    /// The chat-completions URL for the configured deployment.
    #[must_use]
    pub fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment
        )
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = self.chat_url();
        let body = ChatRequest {
            model: &self.config.deployment,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            stop: &request.stop,
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("api-version", self.config.api_version.as_str())])
            .header("api-key", self.config.api_key.expose())
            .timeout(self.config.timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| CrawlError::transport(&url, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CrawlError::transport(&url, e.to_string()))?;

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(CrawlError::fetch(&url, status.as_u16()));
        }
        if !status.is_success() {
            warn!(status = %status, error = %text, "Completion API error");
            return Err(CrawlError::Completion(format!("HTTP {status}: {text}")));
        }

        parse_chat_response(&text)
    }
}

#[async_trait]
impl CompletionService for AzureOpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let timer = SpanTimer::start("completion");
        let completion = with_retry(
            &self.config.retry,
            "completion",
            CrawlError::is_transient,
            || self.complete_once(request),
        )
        .await?;

        debug!(
            deployment = %self.config.deployment,
            duration_ms = timer.finish(),
            finish_reason = completion.finish_reason.as_deref(),
            "Completion finished"
        );
        Ok(completion)
    }
}
