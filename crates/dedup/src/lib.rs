pub mod cluster;
pub mod clusterer;

pub use cluster::{DuplicateCluster, MergePolicy, MergedArticle};
pub use clusterer::{DedupConfig, DedupOutcome, Deduplicator};
