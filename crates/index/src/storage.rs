use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::ports::{MetadataStorePort, VectorIndexPort};
use crate::record::StoredRecord;
use ingest::{ArticleId, NewsError, bounded};

/// Dual write: vector index first, then metadata. Committed only when both
/// land; when one write fails the other is rolled back so no half-written
/// record stays visible.
#[derive(Clone)]
pub struct StorageStage {
    metadata: Arc<dyn MetadataStorePort>,
    vectors: Arc<dyn VectorIndexPort>,
}

impl StorageStage {
    pub fn new(metadata: Arc<dyn MetadataStorePort>, vectors: Arc<dyn VectorIndexPort>) -> Self {
        Self { metadata, vectors }
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataStorePort> {
        &self.metadata
    }

    pub async fn store(&self, record: StoredRecord, timeout: Duration) -> Result<ArticleId, NewsError> {
        let id = record.id;

        let vector_write = bounded("vector_index", timeout, self.vectors.upsert(id, &record.embedding)).await;
        let metadata_write = bounded("metadata_store", timeout, self.metadata.put(record)).await;

        match (vector_write, metadata_write) {
            (Ok(()), Ok(())) => {
                debug!(record_id = %id, "record committed");
                Ok(id)
            }
            (Err(vector_err), Err(metadata_err)) => {
                warn!(record_id = %id, metadata_error = %metadata_err, "both storage writes failed");
                Err(vector_err)
            }
            (Err(err), Ok(())) => {
                let rollback = bounded("metadata_store", timeout, self.metadata.delete(id)).await;
                Err(inconsistent(id, format!("vector index failed: {err}"), "metadata", rollback))
            }
            (Ok(()), Err(err)) => {
                let rollback = bounded("vector_index", timeout, self.vectors.delete(id)).await;
                Err(inconsistent(id, format!("metadata store failed: {err}"), "vector", rollback))
            }
        }
    }
}

fn inconsistent(id: ArticleId, cause: String, written: &str, rollback: Result<(), NewsError>) -> NewsError {
    let detail = match rollback {
        Ok(()) => format!("{cause}; {written} write rolled back"),
        Err(e) => {
            warn!(record_id = %id, error = %e, "rollback failed, record left half-written");
            format!("{cause}; {written} rollback failed: {e}")
        }
    };
    NewsError::StorageConsistency {
        id: id.to_string(),
        detail,
    }
}
