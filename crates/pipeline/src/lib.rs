pub mod cache;
pub mod config;
pub mod context;
pub mod metrics;
pub mod orchestrator;
pub mod retry;

pub use cache::{CacheStats, CachedEmbedder};
pub use config::{CacheConfig, OperationMode, PipelineConfig, RetryConfig, TimeoutConfig};
pub use context::{CancelHandle, RunContext};
pub use metrics::{MetricsSnapshot, PipelineMetrics, TimedOperation};
pub use orchestrator::{
    ArticleOutcome, BatchCounts, BatchReport, PipelineOrchestrator, PipelinePorts, PipelineStats,
};
pub use retry::RetryPolicy;
