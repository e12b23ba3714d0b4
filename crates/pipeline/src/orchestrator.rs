use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheStats, CachedEmbedder};
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::metrics::{MetricsSnapshot, PipelineMetrics, TimedOperation};
use crate::retry::RetryPolicy;
use dedup::{Deduplicator, MergedArticle};
use extract::{EntityExtractionStage, EntityExtractorPort, StockImpactStage};
use index::{MetadataStorePort, StorageStage, StoredRecord, VectorIndexPort};
use ingest::{ArticleId, CanonicalArticle, EmbeddingPort, IngestionStage, NewsError, RawArticle, bounded};
use query::{QueryEngine, QueryResponse};

/// External collaborators the pipeline is wired to.
#[derive(Clone)]
pub struct PipelinePorts {
    pub embedder: Arc<dyn EmbeddingPort>,
    pub tagger: Arc<dyn EntityExtractorPort>,
    pub metadata: Arc<dyn MetadataStorePort>,
    pub vectors: Arc<dyn VectorIndexPort>,
}

/// What happened to one input article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArticleOutcome {
    Stored { record_id: ArticleId },
    /// Folded into another article's record
    Merged { into: ArticleId },
    Skipped { reason: String },
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub received: usize,
    pub ingested: usize,
    pub deduplicated_away: usize,
    pub stored: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    /// One per input article, in input order
    pub outcomes: Vec<ArticleOutcome>,
    pub counts: BatchCounts,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub stored_records: usize,
    pub metrics: MetricsSnapshot,
    pub cache: Option<CacheStats>,
}

/// Runs batches through ingest -> dedup -> extract -> impact -> store,
/// and serves queries over what was stored.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    ingestion: IngestionStage,
    deduplicator: Deduplicator,
    extraction: EntityExtractionStage,
    impact: StockImpactStage,
    storage: StorageStage,
    query_engine: QueryEngine,
    retry: RetryPolicy,
    metrics: Arc<PipelineMetrics>,
    cache: Option<Arc<CachedEmbedder>>,
}

impl PipelineOrchestrator {
    pub fn new(config: PipelineConfig, ports: PipelinePorts) -> Result<Self> {
        config.validate()?;
        for problem in config.keywords.validate() {
            warn!(problem = %problem, "keyword table inconsistency, affected impacts will be partial");
        }

        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(CachedEmbedder::new(ports.embedder.clone(), config.cache.max_entries)));
        let embedder: Arc<dyn EmbeddingPort> = match &cache {
            Some(cached) => cached.clone(),
            None => ports.embedder.clone(),
        };

        let table = Arc::new(config.keywords.clone());
        let extraction = EntityExtractionStage::new(ports.tagger.clone(), table.clone())?;
        let query_engine = QueryEngine::new(
            embedder.clone(),
            extraction.clone(),
            ports.metadata.clone(),
            ports.vectors.clone(),
            config.query.clone(),
        )
        .with_timeout(config.timeouts.embed().max(config.timeouts.extract()));

        Ok(Self {
            ingestion: IngestionStage::new(embedder, config.embedding_dimension),
            deduplicator: Deduplicator::new(config.dedup.clone()),
            impact: StockImpactStage::new(table, config.impact.clone()),
            storage: StorageStage::new(ports.metadata, ports.vectors),
            extraction,
            query_engine,
            retry: RetryPolicy::from_config(&config.retry),
            metrics: Arc::new(PipelineMetrics::new()),
            cache,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Fresh context for one batch, using the configured timeouts.
    pub fn run_context(&self) -> RunContext {
        RunContext::new(&self.config)
    }

    pub async fn process_batch(&self, articles: Vec<RawArticle>, ctx: &RunContext) -> BatchReport {
        info!(batch_id = %ctx.batch_id, articles = articles.len(), "batch started");

        let mut outcomes: Vec<Option<ArticleOutcome>> = vec![None; articles.len()];
        let mut warnings = Vec::new();

        // Step 1: ingest
        let mut ingested: Vec<CanonicalArticle> = Vec::new();
        let mut input_index: HashMap<ArticleId, usize> = HashMap::new();
        for (idx, raw) in articles.iter().enumerate() {
            if ctx.is_cancelled() {
                break;
            }

            let timer = TimedOperation::start();
            let result = self
                .retry
                .retry("ingest", || self.ingestion.ingest(raw, ctx.embed_timeout))
                .await;
            self.metrics.record_ingest(timer.elapsed());

            match result {
                Ok(article) => {
                    input_index.insert(article.id, idx);
                    ingested.push(article);
                }
                Err(NewsError::Validation(reason)) => {
                    warn!(batch_id = %ctx.batch_id, index = idx, reason = %reason, "article skipped");
                    outcomes[idx] = Some(ArticleOutcome::Skipped { reason });
                }
                Err(e) => {
                    warn!(batch_id = %ctx.batch_id, index = idx, error = %e, "article ingestion failed");
                    outcomes[idx] = Some(ArticleOutcome::Failed { reason: e.to_string() });
                }
            }
        }
        let ingested_count = ingested.len();

        // Step 2: deduplicate
        let timer = TimedOperation::start();
        let dedup = self.deduplicator.cluster(&ingested);
        self.metrics.record_dedup(timer.elapsed());

        // Step 3: extract, map, store per cluster
        for merged in &dedup.merged {
            if ctx.is_cancelled() {
                break;
            }

            let member_outcomes = match self.commit(merged, ctx, &mut warnings).await {
                Ok(record_id) => {
                    debug!(record_id = %record_id, members = merged.member_ids.len(), "cluster stored");
                    merged
                        .member_ids
                        .iter()
                        .map(|id| {
                            let outcome = if *id == record_id {
                                ArticleOutcome::Stored { record_id }
                            } else {
                                ArticleOutcome::Merged { into: record_id }
                            };
                            (*id, outcome)
                        })
                        .collect::<Vec<_>>()
                }
                Err(e) => {
                    warn!(batch_id = %ctx.batch_id, record_id = %merged.id(), error = %e, kind = e.kind(), "cluster failed");
                    merged
                        .member_ids
                        .iter()
                        .map(|id| (*id, ArticleOutcome::Failed { reason: e.to_string() }))
                        .collect()
                }
            };

            for (id, outcome) in member_outcomes {
                if let Some(&idx) = input_index.get(&id) {
                    outcomes[idx] = Some(outcome);
                }
            }
        }

        let outcomes: Vec<ArticleOutcome> = outcomes
            .into_iter()
            .map(|o| o.unwrap_or(ArticleOutcome::Cancelled))
            .collect();
        let counts = count(&outcomes, ingested_count);
        self.metrics.record_batch(&counts);

        info!(
            batch_id = %ctx.batch_id,
            received = counts.received,
            stored = counts.stored,
            deduplicated_away = counts.deduplicated_away,
            skipped = counts.skipped,
            failed = counts.failed,
            cancelled = counts.cancelled,
            "batch finished"
        );

        BatchReport {
            batch_id: ctx.batch_id,
            outcomes,
            counts,
            warnings,
        }
    }

    async fn commit(
        &self,
        merged: &MergedArticle,
        ctx: &RunContext,
        warnings: &mut Vec<String>,
    ) -> Result<ArticleId, NewsError> {
        let timer = TimedOperation::start();
        let extraction = self
            .retry
            .retry("extract", || self.extraction.extract(&merged.merged_text, ctx.extract_timeout))
            .await?;
        self.metrics.record_extract(timer.elapsed(), extraction.entities.len());

        let impacts = match self.impact.map(&extraction) {
            Ok(impacts) => impacts,
            Err(e) => {
                warn!(record_id = %merged.id(), error = %e, "impact mapping incomplete, keeping partial impacts");
                warnings.push(format!("{}: {}", merged.id(), e));
                e.partial
            }
        };

        let record = StoredRecord::from_merged(merged, extraction.entities, impacts);
        let timer = TimedOperation::start();
        let stored = self
            .retry
            .retry("store", || self.storage.store(record.clone(), ctx.store_timeout))
            .await;
        self.metrics.record_store(timer.elapsed());
        stored
    }

    pub async fn query(&self, text: &str, max_results: Option<usize>) -> Result<QueryResponse, NewsError> {
        let timer = TimedOperation::start();
        let response = self.query_engine.query(text, max_results).await;
        self.metrics.record_query(timer.elapsed(), response.is_ok());
        response
    }

    /// Stored records, newest first.
    pub async fn list_recent(&self, limit: usize, offset: usize) -> Result<Vec<StoredRecord>, NewsError> {
        bounded(
            "metadata_store",
            self.config.timeouts.store(),
            self.storage.metadata().list(limit, offset),
        )
        .await
    }

    pub async fn get(&self, id: ArticleId) -> Result<Option<StoredRecord>, NewsError> {
        bounded("metadata_store", self.config.timeouts.store(), self.storage.metadata().get(id)).await
    }

    pub async fn stats(&self) -> Result<PipelineStats, NewsError> {
        let stored_records = bounded(
            "metadata_store",
            self.config.timeouts.store(),
            self.storage.metadata().count(),
        )
        .await?;

        Ok(PipelineStats {
            stored_records,
            metrics: self.metrics.snapshot(),
            cache: self.cache.as_ref().map(|c| c.stats()),
        })
    }
}

fn count(outcomes: &[ArticleOutcome], ingested: usize) -> BatchCounts {
    let mut counts = BatchCounts {
        received: outcomes.len(),
        ingested,
        ..BatchCounts::default()
    };
    for outcome in outcomes {
        match outcome {
            ArticleOutcome::Stored { .. } => counts.stored += 1,
            ArticleOutcome::Merged { .. } => counts.deduplicated_away += 1,
            ArticleOutcome::Skipped { .. } => counts.skipped += 1,
            ArticleOutcome::Failed { .. } => counts.failed += 1,
            ArticleOutcome::Cancelled => counts.cancelled += 1,
        }
    }
    counts
}
