//! Configuration for a crawler process.
//!
//! A single [`CrawlerConfig`] is built at process start (usually via
//! [`CrawlerConfig::from_env`]) and handed to the fetcher, extractor,
//! geocoder and pipeline constructors. Nothing in the core reads the
//! environment on its own.

use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::{CrawlError, Result};
use crate::retry::RetryConfig;

/// Default number of pages walked per run.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Environment variable names read by [`CrawlerConfig::from_env`].
pub mod env {
    /// Azure OpenAI resource endpoint.
    pub const AZURE_OPENAI_ENDPOINT: &str = "APPSETTING_AZURE_OPENAI_ENDPOINT";
    /// Azure OpenAI deployment name.
    pub const AZURE_OPENAI_DEPLOYMENT: &str = "APPSETTING_AZURE_OPENAI_DEPLOYMENT";
    /// Azure OpenAI API key.
    pub const AZURE_OPENAI_KEY: &str = "APPSETTING_AZURE_OPENAI_KEY";
    /// Bing Maps locations endpoint.
    pub const BING_MAPS_API_ENDPOINT: &str = "APPSETTING_BING_MAPS_API_ENDPOINT";
    /// Bing Maps API key.
    pub const BING_MAPS_API_KEY: &str = "APPSETTING_BING_MAPS_API_KEY";
    /// Optional page budget override.
    pub const MAX_PAGES: &str = "APPSETTING_MAX_PAGES";
    /// Optional geocoding parallelism override.
    pub const GEOCODE_CONCURRENCY: &str = "APPSETTING_GEOCODE_CONCURRENCY";
    /// Optional page fetch timeout override, in seconds.
    pub const HTTP_TIMEOUT_SECONDS: &str = "APPSETTING_HTTP_TIMEOUT_SECONDS";
}

/// An API key that never shows up in logs or debug output.
pub struct ApiKey(SecretBox<str>);

impl ApiKey {
    /// Wraps a key.
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Exposes the key for use in a request.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the key is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl Default for ApiKey {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Configuration for page fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Retry policy for transient failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_fetch_timeout() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    concat!("placecrawl/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_fetch_timeout(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }
}

/// Configuration for the text-completion service used for extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Service endpoint, e.g. `https://myresource.openai.azure.com`.
    #[serde(default)]
    pub endpoint: String,
    /// Deployment (model) name.
    #[serde(default)]
    pub deployment: String,
    /// API key.
    #[serde(skip)]
    pub api_key: ApiKey,
    /// API version query parameter.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Stop sequence; the reply ends before the first occurrence.
    #[serde(default = "default_stop")]
    pub stop: String,
    /// Page text is cut to this many characters before prompting.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Request timeout in seconds.
    #[serde(default = "default_completion_timeout")]
    pub timeout_seconds: f64,
    /// Retry policy for transient failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_api_version() -> String {
    "2023-05-15".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_stop() -> String {
    "]".to_string()
}

fn default_max_input_chars() -> usize {
    8000
}

fn default_completion_timeout() -> f64 {
    60.0
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: String::new(),
            api_key: ApiKey::default(),
            api_version: default_api_version(),
            temperature: default_temperature(),
            stop: default_stop(),
            max_input_chars: default_max_input_chars(),
            timeout_seconds: default_completion_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl CompletionConfig {
    /// Creates a completion config for an endpoint and deployment.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_key: ApiKey::new(api_key),
            ..Self::default()
        }
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }
}

/// Configuration for the geocoding backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Locations endpoint, e.g. `https://dev.virtualearth.net/REST/v1/Locations`.
    #[serde(default)]
    pub endpoint: String,
    /// API key.
    #[serde(skip)]
    pub api_key: ApiKey,
    /// Maximum candidates requested per lookup.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Request timeout in seconds.
    #[serde(default = "default_geocode_timeout")]
    pub timeout_seconds: f64,
}

fn default_max_results() -> u32 {
    1
}

fn default_geocode_timeout() -> f64 {
    10.0
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: ApiKey::default(),
            max_results: default_max_results(),
            timeout_seconds: default_geocode_timeout(),
        }
    }
}

impl GeocodingConfig {
    /// Creates a geocoding config for an endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: ApiKey::new(api_key),
            ..Self::default()
        }
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }
}

/// Top-level configuration for a crawler process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum pages walked per run.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Maximum in-flight geocoding lookups per page.
    #[serde(default = "default_geocode_concurrency")]
    pub geocode_concurrency: usize,
    /// Page fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Extraction service configuration.
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Geocoding backend configuration.
    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_geocode_concurrency() -> usize {
    4
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            geocode_concurrency: default_geocode_concurrency(),
            fetch: FetchConfig::default(),
            completion: CompletionConfig::default(),
            geocoding: GeocodingConfig::default(),
        }
    }
}

impl CrawlerConfig {
    /// Creates a configuration with defaults and no upstream credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page budget.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets the geocoding parallelism.
    #[must_use]
    pub fn with_geocode_concurrency(mut self, concurrency: usize) -> Self {
        self.geocode_concurrency = concurrency;
        self
    }

    /// Sets the completion configuration.
    #[must_use]
    pub fn with_completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    /// Sets the geocoding configuration.
    #[must_use]
    pub fn with_geocoding(mut self, geocoding: GeocodingConfig) -> Self {
        self.geocoding = geocoding;
        self
    }

    /// Builds a configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CrawlError::Config(format!("{key} is not set")))
        };

        let mut config = Self::new()
            .with_completion(CompletionConfig::new(
                required(env::AZURE_OPENAI_ENDPOINT)?,
                required(env::AZURE_OPENAI_DEPLOYMENT)?,
                required(env::AZURE_OPENAI_KEY)?,
            ))
            .with_geocoding(GeocodingConfig::new(
                required(env::BING_MAPS_API_ENDPOINT)?,
                required(env::BING_MAPS_API_KEY)?,
            ));

        if let Some(raw) = lookup(env::MAX_PAGES) {
            config.max_pages = parse_var(env::MAX_PAGES, &raw)?;
        }
        if let Some(raw) = lookup(env::GEOCODE_CONCURRENCY) {
            config.geocode_concurrency = parse_var(env::GEOCODE_CONCURRENCY, &raw)?;
        }
        if let Some(raw) = lookup(env::HTTP_TIMEOUT_SECONDS) {
            config.fetch.timeout_seconds = parse_var(env::HTTP_TIMEOUT_SECONDS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(CrawlError::Config("max_pages must be at least 1".into()));
        }
        if self.geocode_concurrency == 0 {
            return Err(CrawlError::Config(
                "geocode_concurrency must be at least 1".into(),
            ));
        }
        if self.completion.endpoint.is_empty() || self.completion.deployment.is_empty() {
            return Err(CrawlError::Config(
                "completion endpoint and deployment are required".into(),
            ));
        }
        if self.geocoding.endpoint.is_empty() {
            return Err(CrawlError::Config("geocoding endpoint is required".into()));
        }
        for (name, seconds) in [
            ("fetch", self.fetch.timeout_seconds),
            ("completion", self.completion.timeout_seconds),
            ("geocoding", self.geocoding.timeout_seconds),
        ] {
            if !(seconds.is_finite() && seconds > 0.0) {
                return Err(CrawlError::Config(format!(
                    "{name} timeout must be a positive number of seconds"
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CrawlError::Config(format!("{key} has an invalid value: {raw:?}")))
}
