use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use ingest::NewsError;

/// Bounded retries for port calls. Only errors that report themselves as
/// retryable get another attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.initial_backoff_ms, config.max_backoff_ms)
    }

    /// Delay before retry number `retry` (1-based): doubles each time, capped.
    pub fn backoff_for(&self, retry: usize) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    pub async fn retry<F, Fut, T>(&self, operation: &str, mut attempt_once: F) -> Result<T, NewsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NewsError>>,
    {
        let mut retries = 0;
        loop {
            let err = match attempt_once().await {
                Ok(value) => {
                    if retries > 0 {
                        debug!(operation, retries, "recovered after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() || retries >= self.max_retries {
                if err.is_retryable() {
                    warn!(operation, retries, kind = err.kind(), error = %err, "giving up");
                }
                return Err(err);
            }

            retries += 1;
            let delay = self.backoff_for(retries);
            warn!(
                operation,
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                kind = err.kind(),
                error = %err,
                "retrying"
            );
            sleep(delay).await;
        }
    }
}
