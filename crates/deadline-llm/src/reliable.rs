use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use deadline_core::errors::OracleError;
use deadline_core::oracle::Oracle;

/// Retry behaviour for [`ReliableOracle`].
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

/// Wraps an oracle with retry on transient transport failures.
///
/// - Only errors reporting `is_retryable()` are retried.
/// - `retry_after` hints from rate-limit responses win over the computed backoff.
/// - Calls stay sequential; a retry happens before the next sentence is sent.
pub struct ReliableOracle<O: Oracle> {
    inner: O,
    config: RetryConfig,
    total_retries: AtomicU64,
}

impl<O: Oracle> ReliableOracle<O> {
    pub fn new(inner: O, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            total_retries: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(inner: O) -> Self {
        Self::new(inner, RetryConfig::default())
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn total_retries(&self) -> u64 {
        self.total_retries.load(Ordering::Relaxed)
    }

    /// Exponential backoff with jitter, or the server's hint when it gave one.
    fn retry_delay(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        if let Some(delay) = suggested {
            return delay;
        }

        let exp_delay = self.config.base_delay.as_millis() as f64 * 2.0_f64.powi(attempt as i32);
        let capped = exp_delay.min(self.config.max_delay.as_millis() as f64);

        let jitter_range = capped * self.config.jitter_factor;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }
}

#[async_trait]
impl<O: Oracle> Oracle for ReliableOracle<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let mut attempt = 0;
        loop {
            match self.inner.respond(system_prompt, user_prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.retry_delay(attempt, e.suggested_delay());
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        error_kind = e.error_kind(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying oracle call: {e}"
                    );
                    let _ = self.total_retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
