use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use deadline_core::config::OracleConfig;
use deadline_core::errors::OracleError;
use deadline_core::oracle::Oracle;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Oracle backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// Works with hosted APIs, local model servers, and enterprise gateways that
/// speak the same envelope.
pub struct ChatCompletionsOracle {
    client: Client,
    config: OracleConfig,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionsOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(config.timeout))
            .timeout(config.timeout)
            .build()
            .map_err(|e| OracleError::NetworkError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": 0.0,
        })
    }

    fn map_send_error(&self, e: &reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.config.timeout)
        } else {
            OracleError::NetworkError(e.to_string())
        }
    }
}

/// Pull `choices[0].message.content` out of a response body.
fn extract_content(body: &str) -> Result<String, OracleError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| OracleError::MalformedResponse(format!("invalid JSON envelope: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| OracleError::MalformedResponse(format!("missing choices[0].message.content: {body}")))
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl Oracle for ChatCompletionsOracle {
    fn name(&self) -> &str {
        "chat_completions"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let mut req = self
            .client
            .post(self.config.chat_completions_url())
            .header("content-type", "application/json")
            .json(&self.request_body(system_prompt, user_prompt));
        if let Some(key) = &self.config.api_key {
            req = req.header("Authorization", key.bearer());
        }

        let resp = req.send().await.map_err(|e| self.map_send_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = retry_after(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            return Err(match OracleError::from_status(status.as_u16(), body) {
                OracleError::RateLimited { .. } => OracleError::RateLimited { retry_after },
                other => other,
            });
        }

        let body = resp.text().await.map_err(|e| self.map_send_error(&e))?;
        let content = extract_content(&body)?;
        debug!(chars = content.len(), "oracle responded");
        Ok(content)
    }
}
