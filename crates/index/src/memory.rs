use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::ports::{MetadataStorePort, RecordFilter, VectorIndexPort};
use crate::record::{StoredRecord, sort_recent};
use ingest::{ArticleId, cosine_similarity};

/// Process-local metadata store. Writes to one id are serialized by the map shard lock.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    records: DashMap<ArticleId, StoredRecord>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStorePort for InMemoryMetadataStore {
    async fn put(&self, record: StoredRecord) -> Result<()> {
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: ArticleId) -> Result<Option<StoredRecord>> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord>> {
        let mut matched: Vec<StoredRecord> = self
            .records
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        sort_recent(&mut matched);
        Ok(matched)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<StoredRecord>> {
        let mut all: Vec<StoredRecord> = self.records.iter().map(|entry| entry.value().clone()).collect();
        sort_recent(&mut all);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    async fn delete(&self, id: ArticleId) -> Result<()> {
        self.records.remove(&id);
        Ok(())
    }
}

/// Brute-force cosine index.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    vectors: DashMap<ArticleId, Vec<f32>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[async_trait]
impl VectorIndexPort for InMemoryVectorIndex {
    async fn upsert(&self, id: ArticleId, vector: &[f32]) -> Result<()> {
        self.vectors.insert(id, vector.to_vec());
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(ArticleId, f32)>> {
        let mut scored: Vec<(ArticleId, f32)> = self
            .vectors
            .iter()
            .map(|entry| (*entry.key(), cosine_similarity(vector, entry.value())))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete(&self, id: ArticleId) -> Result<()> {
        self.vectors.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::record;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn test_put_overwrites_by_id() {
        let store = InMemoryMetadataStore::new();
        let mut rec = record(9, &["HDFC Bank"], &[]);
        store.put(rec.clone()).await.unwrap();
        rec.headline = "updated".to_string();
        store.put(rec.clone()).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(rec.id).await.unwrap().unwrap().headline, "updated");
        assert!(store.get(ArticleId::generate()).await.unwrap().is_none());

        store.delete(rec.id).await.unwrap();
        store.delete(rec.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_pages_newest_first() {
        let store = InMemoryMetadataStore::new();
        for hour in [7, 12, 9, 10] {
            store.put(record(hour, &[], &[])).await.unwrap();
        }

        let page: Vec<String> = store.list(2, 1).await.unwrap().into_iter().map(|r| r.headline).collect();
        assert_eq!(page, vec!["headline 10", "headline 9"]);
        assert!(store.list(5, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_by_entities() {
        let store = InMemoryMetadataStore::new();
        store.put(record(9, &["HDFC Bank"], &["Banking"])).await.unwrap();
        store.put(record(10, &["Infosys"], &["IT"])).await.unwrap();

        let filter = RecordFilter {
            sectors: BTreeSet::from(["banking".to_string()]),
            ..RecordFilter::default()
        };
        let hits = store.query(&filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].entities.companies.contains("HDFC Bank"));
    }

    #[tokio::test]
    async fn test_vector_search_ranks_by_cosine() {
        let index = InMemoryVectorIndex::new();
        let near = ArticleId::generate();
        let far = ArticleId::generate();
        index.upsert(near, &[1.0, 0.1]).await.unwrap();
        index.upsert(far, &[0.0, 1.0]).await.unwrap();
        index.upsert(far, &[0.1, 1.0]).await.unwrap();

        let hits = index.search(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(hits[0].0, near);
        assert!(hits[0].1 > hits[1].1);
        assert_eq!(index.search(&[1.0, 0.0], 1).await.unwrap().len(), 1);

        index.delete(near).await.unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 5).await.unwrap()[0].0, far);
    }
}
