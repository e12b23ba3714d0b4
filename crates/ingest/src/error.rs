use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy shared by every pipeline stage.
#[derive(Debug, Error)]
pub enum NewsError {
    /// Malformed input article. Skipped, never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An external port did not answer within its budget.
    #[error("{port} timed out after {timeout_ms}ms")]
    PortTimeout { port: &'static str, timeout_ms: u64 },

    /// Keyword/impact tables disagree with each other.
    #[error("impact mapping inconsistent: {0}")]
    Mapping(String),

    /// Exactly one of the two storage writes landed.
    #[error("storage inconsistent for {id}: {detail}")]
    StorageConsistency { id: String, detail: String },

    #[error(transparent)]
    Port(#[from] anyhow::Error),
}

impl NewsError {
    /// Whether a second attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NewsError::PortTimeout { .. } | NewsError::Port(_) | NewsError::StorageConsistency { .. }
        )
    }

    /// Short machine-friendly tag used in batch reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NewsError::Validation(_) => "validation",
            NewsError::PortTimeout { .. } => "port_timeout",
            NewsError::Mapping(_) => "mapping",
            NewsError::StorageConsistency { .. } => "storage_consistency",
            NewsError::Port(_) => "port",
        }
    }
}

/// Run a port call under a deadline, lifting its error into [`NewsError`].
pub async fn bounded<T, F>(port: &'static str, limit: Duration, call: F) -> Result<T, NewsError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(NewsError::Port(e.context(format!("{port} call failed")))),
        Err(_) => Err(NewsError::PortTimeout {
            port,
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
