//! Oracle client configuration.
//!
//! Resolved once (normally from the environment) and handed to the client
//! constructor by value. Nothing here is read lazily or cached globally.
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `DEADLINE_LLM_BASE_URL` | OpenAI-compatible endpoint root | required |
//! | `DEADLINE_LLM_API_KEY` | bearer token | none |
//! | `DEADLINE_LLM_MODEL` | model identifier | `gpt-4.1-mini` |
//! | `DEADLINE_LLM_TIMEOUT_SECS` | per-request timeout, 1..=600 | 30 |
//! | `DEADLINE_LLM_MAX_RETRIES` | retries for retryable failures, 0..=10 | 0 |

use std::time::Duration;

use tracing::warn;

use crate::errors::ConfigError;
use crate::security::ApiKey;

pub const ENV_BASE_URL: &str = "DEADLINE_LLM_BASE_URL";
pub const ENV_API_KEY: &str = "DEADLINE_LLM_API_KEY";
pub const ENV_MODEL: &str = "DEADLINE_LLM_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "DEADLINE_LLM_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "DEADLINE_LLM_MAX_RETRIES";

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct OracleConfig {
    /// Endpoint root without a trailing slash, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: Option<ApiKey>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl OracleConfig {
    /// Build a config for `base_url` with every other field at its default.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(&base_url.into()).ok_or(ConfigError::MissingBaseUrl(ENV_BASE_URL))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: ENV_BASE_URL,
                value: base_url,
            });
        }
        Ok(Self {
            base_url,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
        })
    }

    /// Resolve configuration from `DEADLINE_LLM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup.
    ///
    /// Blank values count as unset. Out-of-range numbers are ignored with a
    /// warning and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(read(ENV_BASE_URL).unwrap_or_default())?;

        if let Some(key) = read(ENV_API_KEY) {
            config.api_key = Some(ApiKey::new(key.trim()));
        }
        if let Some(model) = read(ENV_MODEL) {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = read(ENV_TIMEOUT_SECS) {
            match parse_u64_range(&raw, 1, 600) {
                Some(secs) => config.timeout = Duration::from_secs(secs),
                None => warn!(key = ENV_TIMEOUT_SECS, value = %raw, "invalid timeout env var, ignoring"),
            }
        }
        if let Some(raw) = read(ENV_MAX_RETRIES) {
            match parse_u64_range(&raw, 0, 10) {
                Some(n) => config.max_retries = n as u32,
                None => warn!(key = ENV_MAX_RETRIES, value = %raw, "invalid retry count env var, ignoring"),
            }
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(ApiKey::new(key));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Full URL of the chat completions route.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
