use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use dedup::DedupConfig;
use extract::{ImpactConfig, KeywordTable};
use query::QueryConfig;

/// Everything a pipeline run depends on. Built once and passed explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: OperationMode,
    pub embedding_dimension: usize,
    pub dedup: DedupConfig,
    pub impact: ImpactConfig,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    pub query: QueryConfig,
    pub cache: CacheConfig,
    pub keywords: KeywordTable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Fast,     // Short deadlines, cache everything
    Strict,   // Tighter dedup and ranking, no cache
    Balanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub embed_ms: u64,
    pub extract_ms: u64,
    pub store_ms: u64,
}

impl TimeoutConfig {
    pub fn embed(&self) -> Duration {
        Duration::from_millis(self.embed_ms)
    }

    pub fn extract(&self) -> Duration {
        Duration::from_millis(self.extract_ms)
    }

    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Balanced,
            embedding_dimension: 384,
            dedup: DedupConfig::default(),
            impact: ImpactConfig::default(),
            timeouts: TimeoutConfig {
                embed_ms: 10_000,
                extract_ms: 60_000,
                store_ms: 5_000,
            },
            retry: RetryConfig {
                max_retries: 1,
                initial_backoff_ms: 250,
                max_backoff_ms: 2_000,
            },
            query: QueryConfig::default(),
            cache: CacheConfig {
                enabled: true,
                max_entries: 10_000,
            },
            keywords: KeywordTable::default(),
        }
    }
}

impl PipelineConfig {
    pub fn fast() -> Self {
        let base = Self::default();
        Self {
            mode: OperationMode::Fast,
            timeouts: TimeoutConfig {
                embed_ms: 3_000,
                extract_ms: 15_000,
                store_ms: 2_000,
            },
            retry: RetryConfig {
                max_retries: 1,
                initial_backoff_ms: 100,
                max_backoff_ms: 500,
            },
            query: QueryConfig {
                candidate_pool: 10,
                ..base.query.clone()
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: 50_000,
            },
            ..base
        }
    }

    pub fn strict() -> Self {
        let base = Self::default();
        Self {
            mode: OperationMode::Strict,
            dedup: DedupConfig {
                similarity_threshold: 0.9,
                ..base.dedup.clone()
            },
            timeouts: TimeoutConfig {
                embed_ms: 30_000,
                extract_ms: 120_000,
                store_ms: 10_000,
            },
            retry: RetryConfig {
                max_retries: 1,
                initial_backoff_ms: 1_000,
                max_backoff_ms: 10_000,
            },
            query: QueryConfig {
                candidate_pool: 50,
                relevance_floor: 0.35,
                ..base.query.clone()
            },
            cache: CacheConfig {
                enabled: false,
                max_entries: 0,
            },
            ..base
        }
    }

    /// Parse JSON (missing fields take defaults) and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse pipeline config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `NEWS_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup("NEWS_SIMILARITY_THRESHOLD") {
            self.dedup.similarity_threshold = raw
                .trim()
                .parse()
                .with_context(|| format!("NEWS_SIMILARITY_THRESHOLD is not a number: {raw}"))?;
        }
        if let Some(raw) = lookup("NEWS_EMBED_TIMEOUT_MS") {
            self.timeouts.embed_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("NEWS_EMBED_TIMEOUT_MS is not an integer: {raw}"))?;
        }
        if let Some(raw) = lookup("NEWS_RELEVANCE_FLOOR") {
            self.query.relevance_floor = raw
                .trim()
                .parse()
                .with_context(|| format!("NEWS_RELEVANCE_FLOOR is not a number: {raw}"))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.embedding_dimension == 0 {
            problems.push("embedding_dimension must be positive".to_string());
        }
        let unit = |name: &str, value: f32, problems: &mut Vec<String>| {
            if !(0.0..=1.0).contains(&value) {
                problems.push(format!("{name} must be within [0, 1], got {value}"));
            }
        };
        unit("dedup.similarity_threshold", self.dedup.similarity_threshold, &mut problems);
        unit("impact.sector_min", self.impact.sector_min, &mut problems);
        unit("impact.sector_max", self.impact.sector_max, &mut problems);
        unit("impact.regulator_min", self.impact.regulator_min, &mut problems);
        unit("impact.regulator_max", self.impact.regulator_max, &mut problems);

        if self.dedup.material_length_ratio < 1.0 {
            problems.push("dedup.material_length_ratio must be at least 1".to_string());
        }
        if self.impact.sector_min > self.impact.sector_max {
            problems.push("impact.sector_min exceeds impact.sector_max".to_string());
        }
        if self.impact.regulator_min > self.impact.regulator_max {
            problems.push("impact.regulator_min exceeds impact.regulator_max".to_string());
        }
        if self.query.relevance_floor < 0.0 {
            problems.push("query.relevance_floor must not be negative".to_string());
        }
        if self.query.max_results_cap == 0 || self.query.default_max_results == 0 {
            problems.push("query result limits must be positive".to_string());
        }
        if self.retry.max_retries > 1 {
            problems.push(format!("retry.max_retries must be 0 or 1, got {}", self.retry.max_retries));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            problems.push("retry.initial_backoff_ms exceeds retry.max_backoff_ms".to_string());
        }
        if self.timeouts.embed_ms == 0 || self.timeouts.extract_ms == 0 || self.timeouts.store_ms == 0 {
            problems.push("timeouts must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Invalid pipeline config: {}", problems.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_presets_are_valid() {
        PipelineConfig::default().validate().unwrap();
        PipelineConfig::fast().validate().unwrap();
        PipelineConfig::strict().validate().unwrap();
        assert_eq!(PipelineConfig::strict().dedup.similarity_threshold, 0.9);
        assert!(!PipelineConfig::strict().cache.enabled);
        for preset in [PipelineConfig::default(), PipelineConfig::fast(), PipelineConfig::strict()] {
            assert_eq!(preset.retry.max_retries, 1);
        }
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"mode": "fast", "embedding_dimension": 768, "dedup": {"similarity_threshold": 0.8, "material_length_ratio": 2.0}}"#,
        )
        .unwrap();

        assert_eq!(config.mode, OperationMode::Fast);
        assert_eq!(config.embedding_dimension, 768);
        assert_eq!(config.dedup.similarity_threshold, 0.8);
        assert_eq!(config.query.default_max_results, 5);
        assert_eq!(config.keywords.sectors.len(), 6);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let err = PipelineConfig::from_json_str(r#"{"dedup": {"similarity_threshold": 1.5, "material_length_ratio": 1.5}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));

        let mut config = PipelineConfig::default();
        config.impact.regulator_min = 0.9;
        assert!(config.validate().is_err());

        let err = PipelineConfig::from_json_str(
            r#"{"retry": {"max_retries": 3, "initial_backoff_ms": 10, "max_backoff_ms": 100}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_overrides() {
        let vars = HashMap::from([
            ("NEWS_SIMILARITY_THRESHOLD", "0.9"),
            ("NEWS_EMBED_TIMEOUT_MS", "1500"),
        ]);
        let mut config = PipelineConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.dedup.similarity_threshold, 0.9);
        assert_eq!(config.timeouts.embed(), Duration::from_millis(1500));
        assert_eq!(config.query.relevance_floor, 0.25);

        let mut config = PipelineConfig::default();
        let err = config
            .apply_overrides(|key| (key == "NEWS_RELEVANCE_FLOOR").then(|| "high".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("NEWS_RELEVANCE_FLOOR"));
    }
}
