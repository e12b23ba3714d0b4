use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::record::StoredRecord;
use ingest::ArticleId;

/// Entity filter for metadata lookups. A record matches when it shares any
/// company, sector or regulator with the filter (case-insensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub companies: BTreeSet<String>,
    pub sectors: BTreeSet<String>,
    pub regulators: BTreeSet<String>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty() && self.sectors.is_empty() && self.regulators.is_empty()
    }

    pub fn matches(&self, record: &StoredRecord) -> bool {
        let entities = &record.entities;
        shares_any(&self.companies, &entities.companies)
            || shares_any(&self.sectors, &entities.sectors)
            || shares_any(&self.regulators, &entities.regulators)
    }
}

fn shares_any(wanted: &BTreeSet<String>, present: &BTreeSet<String>) -> bool {
    wanted
        .iter()
        .any(|w| present.iter().any(|p| p.eq_ignore_ascii_case(w)))
}

/// Durable structured storage for [`StoredRecord`]s. `put` overwrites by id.
#[async_trait]
pub trait MetadataStorePort: Send + Sync {
    async fn put(&self, record: StoredRecord) -> Result<()>;

    async fn get(&self, id: ArticleId) -> Result<Option<StoredRecord>>;

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord>>;

    /// Newest `published_at` first.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<StoredRecord>>;

    async fn count(&self) -> Result<usize>;

    /// Removes the record if present. Deleting a missing id is not an error.
    async fn delete(&self, id: ArticleId) -> Result<()>;
}

/// Nearest-neighbour index over article embeddings. `upsert` overwrites by id.
#[async_trait]
pub trait VectorIndexPort: Send + Sync {
    async fn upsert(&self, id: ArticleId, vector: &[f32]) -> Result<()>;

    /// Up to `k` ids with cosine similarity, most similar first.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(ArticleId, f32)>>;

    /// Removes the point if present.
    async fn delete(&self, id: ArticleId) -> Result<()>;
}
