use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use crate::article::RawArticle;

/// Loads raw articles from `.json` (array) or `.jsonl` (one object per line) files.
pub struct ArticleReader;

impl ArticleReader {
    pub async fn read_file(path: &Path) -> Result<Vec<RawArticle>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        match extension {
            "json" => serde_json::from_str(&content)
                .context(format!("Invalid article array in {:?}", path)),
            "jsonl" => content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .enumerate()
                .map(|(i, line)| {
                    serde_json::from_str(line)
                        .context(format!("Invalid article on line {} of {:?}", i + 1, path))
                })
                .collect(),
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    pub async fn read_directory(dir: &Path) -> Result<Vec<RawArticle>> {
        let mut paths = Vec::new();

        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext == "json" || ext == "jsonl" {
                        paths.push(path);
                    }
                }
            }
        }

        // read_dir order is platform dependent; batches must be reproducible
        paths.sort();

        let mut articles = Vec::new();
        for path in paths {
            articles.extend(Self::read_file(&path).await?);
        }

        Ok(articles)
    }
}
