use anyhow::{Context, Result};
use std::path::PathBuf;

use pipeline::PipelineConfig;

/// Where the server finds its collaborators. Everything defaults to localhost.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub bind_addr: String,
    pub ollama_url: String,
    pub embed_model: String,
    pub tagger_model: String,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub data_dir: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl ServiceSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Self {
            bind_addr: get("NEWS_BIND_ADDR", "0.0.0.0:3000"),
            ollama_url: get("NEWS_OLLAMA_URL", "http://localhost:11434"),
            embed_model: get("NEWS_EMBED_MODEL", "all-minilm"),
            tagger_model: get("NEWS_TAGGER_MODEL", "llama3"),
            qdrant_url: get("NEWS_QDRANT_URL", "http://localhost:6333"),
            qdrant_collection: get("NEWS_QDRANT_COLLECTION", "news_articles"),
            data_dir: PathBuf::from(get("NEWS_DATA_DIR", "data/records")),
            config_path: lookup("NEWS_CONFIG").map(PathBuf::from),
        }
    }

    /// Pipeline config from `NEWS_CONFIG` (if set), then `NEWS_*` overrides.
    pub async fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config_path {
            Some(path) => {
                let json = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                PipelineConfig::from_json_str(&json)?
            }
            None => PipelineConfig::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }
}
