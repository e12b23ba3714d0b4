use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::ports::{MetadataStorePort, RecordFilter};
use crate::record::{StoredRecord, sort_recent};
use ingest::ArticleId;

/// One pretty-printed JSON file per record, named `<id>.json`.
pub struct JsonFileMetadataStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileMetadataStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating record directory {}", dir.display()))?;

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, id: ArticleId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn load_all(&self) -> Result<Vec<StoredRecord>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("listing {}", self.dir.display()))?;

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_record(&path).await {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable record file"),
            }
        }
        Ok(records)
    }
}

async fn read_record(path: &Path) -> Result<StoredRecord> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

#[async_trait]
impl MetadataStorePort for JsonFileMetadataStore {
    async fn put(&self, record: StoredRecord) -> Result<()> {
        let path = self.record_path(record.id);
        let json = serde_json::to_string_pretty(&record).context("serializing record")?;
        let temp_path = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));

        // Last writer wins; the rename keeps readers from seeing half a file
        let _guard = self.write_lock.lock().await;
        fs::write(&temp_path, json)
            .await
            .with_context(|| format!("writing temp record file {}", temp_path.display()))?;

        if let Err(err) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err).with_context(|| {
                format!("renaming {} -> {}", temp_path.display(), path.display())
            });
        }
        Ok(())
    }

    async fn get(&self, id: ArticleId) -> Result<Option<StoredRecord>> {
        let path = self.record_path(id);
        if !fs::try_exists(&path)
            .await
            .with_context(|| format!("checking {}", path.display()))?
        {
            return Ok(None);
        }
        read_record(&path).await.map(Some)
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord>> {
        let mut matched: Vec<StoredRecord> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();
        sort_recent(&mut matched);
        Ok(matched)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<StoredRecord>> {
        let mut all = self.load_all().await?;
        sort_recent(&mut all);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load_all().await?.len())
    }

    async fn delete(&self, id: ArticleId) -> Result<()> {
        let path = self.record_path(id);
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("removing {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::record;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let rec = record(9, &["Infosys"], &["IT"]);

        {
            let store = JsonFileMetadataStore::open(dir.path().join("records")).await.unwrap();
            store.put(rec.clone()).await.unwrap();
            store.put(rec.clone()).await.unwrap();
        }

        let store = JsonFileMetadataStore::open(dir.path().join("records")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(rec.id).await.unwrap(), Some(rec.clone()));
        assert!(store.get(ArticleId::generate()).await.unwrap().is_none());

        store.delete(rec.id).await.unwrap();
        store.delete(rec.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_and_list() {
        let dir = tempdir().unwrap();
        let store = JsonFileMetadataStore::open(dir.path()).await.unwrap();
        store.put(record(8, &["HDFC Bank"], &["Banking"])).await.unwrap();
        store.put(record(10, &["Infosys"], &["IT"])).await.unwrap();
        store.put(record(9, &["ICICI Bank"], &[])).await.unwrap();

        let filter = RecordFilter {
            companies: BTreeSet::from(["ICICI Bank".to_string()]),
            sectors: BTreeSet::from(["Banking".to_string()]),
            ..RecordFilter::default()
        };
        let hits: Vec<String> = store.query(&filter).await.unwrap().into_iter().map(|r| r.headline).collect();
        assert_eq!(hits, vec!["headline 9", "headline 8"]);

        let newest = store.list(1, 0).await.unwrap();
        assert_eq!(newest[0].headline, "headline 10");
    }

    #[tokio::test]
    async fn test_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let store = JsonFileMetadataStore::open(dir.path()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
