use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::config::PipelineConfig;

/// Shared flag that stops a batch between articles.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-batch state threaded through every stage call.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub batch_id: Uuid,
    pub embed_timeout: Duration,
    pub extract_timeout: Duration,
    pub store_timeout: Duration,
    cancel: CancelHandle,
}

impl RunContext {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            embed_timeout: config.timeouts.embed(),
            extract_timeout: config.timeouts.extract(),
            store_timeout: config.timeouts.store(),
            cancel: CancelHandle::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
