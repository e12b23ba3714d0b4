use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ingest::EmbeddingPort;

/// Memoizing wrapper around an embedding model, keyed by SHA-256 of the text.
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingPort>,
    embeddings: DashMap<String, Vec<f32>>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub embeddings_cached: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingPort>, max_entries: usize) -> Self {
        Self {
            inner,
            embeddings: DashMap::new(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn store(&self, key: String, embedding: Vec<f32>) {
        if self.embeddings.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self.embeddings.iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.embeddings.remove(&key);
            }
        }
        self.embeddings.insert(key, embedding);
    }

    fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            embeddings_cached: self.embeddings.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl EmbeddingPort for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = Self::hash_text(text);
        if let Some(hit) = self.embeddings.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.value().clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let embedding = self.inner.embed(text).await?;
        self.store(key, embedding.clone());
        Ok(embedding)
    }
}
