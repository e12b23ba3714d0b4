use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::reasoning::{explain_query, explain_result};
use crate::scoring::{EntityMatch, MatchPath, QueryConfig, QueryTargets};
use extract::{EntityExtractionStage, EntitySet, StockImpact};
use index::{MetadataStorePort, StoredRecord, VectorIndexPort};
use ingest::{ArticleId, EmbeddingPort, NewsError, bounded, cosine_similarity, normalize_text};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub article_id: ArticleId,
    pub headline: String,
    pub relevance_score: f32,
    pub matched_entities: EntitySet,
    pub paths: Vec<MatchPath>,
    pub reasoning: String,
    pub summary: String,
    pub stock_impacts: Vec<StockImpact>,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub results: Vec<QueryResult>,
    pub reasoning: String,
    pub total_results: usize,
    /// Entities recognised in the query text
    pub entity_breakdown: EntitySet,
    /// Strongest impact per symbol across the returned results
    pub impact_summary: Vec<StockImpact>,
}

struct Candidate {
    record: StoredRecord,
    semantic_hit: bool,
}

struct Scored {
    record: StoredRecord,
    cosine: f32,
    semantic_hit: bool,
    found: EntityMatch,
    strongest: Option<StockImpact>,
    relevance: f32,
}

/// Read-only retrieval over the dual store: vector search plus entity expansion.
#[derive(Clone)]
pub struct QueryEngine {
    embedder: Arc<dyn EmbeddingPort>,
    extraction: EntityExtractionStage,
    metadata: Arc<dyn MetadataStorePort>,
    vectors: Arc<dyn VectorIndexPort>,
    config: QueryConfig,
    timeout: Duration,
}

impl QueryEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingPort>,
        extraction: EntityExtractionStage,
        metadata: Arc<dyn MetadataStorePort>,
        vectors: Arc<dyn VectorIndexPort>,
        config: QueryConfig,
    ) -> Self {
        Self {
            embedder,
            extraction,
            metadata,
            vectors,
            config,
            timeout: Duration::from_secs(10),
        }
    }

    /// Deadline applied to every port call made while answering a query.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub async fn query(&self, text: &str, max_results: Option<usize>) -> Result<QueryResponse, NewsError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NewsError::Validation("query text is empty".to_string()));
        }
        let limit = self.config.clamp_max_results(max_results);

        // Step 1: embed and search
        let query_vector = bounded("embedding", self.timeout, self.embedder.embed(&normalize_text(text))).await?;
        let hits = bounded(
            "vector_index",
            self.timeout,
            self.vectors.search(&query_vector, self.config.candidate_pool),
        )
        .await?;

        // Step 2: query entities; a tagger outage degrades to keyword matching
        let entities = match self.extraction.extract(text, self.timeout).await {
            Ok(outcome) => outcome.entities,
            Err(e) => {
                warn!(error = %e, "tagger unavailable for query, using keyword matches only");
                self.extraction.match_keywords(text).entities
            }
        };
        let targets = QueryTargets::new(entities, self.extraction.table());

        // Step 3: union semantic and entity candidates
        let mut candidates: HashMap<ArticleId, Candidate> = HashMap::new();
        for (id, similarity) in &hits {
            if let Some(record) = bounded("metadata_store", self.timeout, self.metadata.get(*id)).await? {
                candidates.insert(*id, Candidate { record, semantic_hit: *similarity > 0.0 });
            } else {
                debug!(record_id = %id, "vector hit without metadata, skipping");
            }
        }

        let semantic_candidates = candidates.len();
        if targets.has_entities() {
            let filter = targets.filter();
            for record in bounded("metadata_store", self.timeout, self.metadata.query(&filter)).await? {
                candidates
                    .entry(record.id)
                    .or_insert(Candidate { record, semantic_hit: false });
            }
        }

        // Step 4: score, rank, cut
        let mut scored: Vec<Scored> = candidates
            .into_values()
            .map(|candidate| self.score(&query_vector, &targets, candidate))
            .filter(|s| s.relevance >= self.config.relevance_floor)
            .collect();

        scored.sort_by(|a, b| {
            b.relevance
                .total_cmp(&a.relevance)
                .then_with(|| b.record.published_at.cmp(&a.record.published_at))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        scored.truncate(limit);

        let mut path_counts: BTreeMap<MatchPath, usize> = BTreeMap::new();
        let results: Vec<QueryResult> = scored
            .into_iter()
            .map(|s| {
                let result = self.build_result(s);
                for path in &result.paths {
                    *path_counts.entry(*path).or_insert(0) += 1;
                }
                result
            })
            .collect();

        let total_results = results.len();
        let reasoning = explain_query(&targets.entities, &path_counts, total_results, self.config.relevance_floor);
        let impact_summary = summarize_impacts(&results, self.config.impact_summary_len);

        info!(
            query = %text,
            semantic_candidates,
            entities = targets.entities.len(),
            results = total_results,
            "query answered"
        );

        Ok(QueryResponse {
            query: text.to_string(),
            results,
            reasoning,
            total_results,
            entity_breakdown: targets.entities,
            impact_summary,
        })
    }

    fn score(&self, query_vector: &[f32], targets: &QueryTargets, candidate: Candidate) -> Scored {
        let Candidate { record, semantic_hit } = candidate;

        let cosine = cosine_similarity(query_vector, &record.embedding);
        let found = targets.match_record(&record);
        let strongest = record
            .impacts
            .iter()
            .filter(|impact| targets.symbols.contains(&impact.symbol))
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .cloned();

        let relevance = self.config.relevance(
            cosine,
            found.overlap(),
            strongest.as_ref().map(|impact| impact.confidence),
        );

        Scored {
            record,
            cosine,
            semantic_hit,
            found,
            strongest,
            relevance,
        }
    }

    fn build_result(&self, scored: Scored) -> QueryResult {
        let reasoning = explain_result(scored.cosine, scored.semantic_hit, &scored.found, scored.strongest.as_ref());

        let mut paths: Vec<MatchPath> = scored.found.paths.iter().copied().collect();
        if scored.semantic_hit {
            paths.insert(0, MatchPath::Semantic);
        }

        let record = scored.record;
        QueryResult {
            article_id: record.id,
            summary: record.summary(self.config.summary_chars),
            headline: record.headline,
            relevance_score: scored.relevance,
            matched_entities: scored.found.matched,
            paths,
            reasoning,
            stock_impacts: record.impacts,
            published_at: record.published_at,
            source: record.source,
            url: record.url,
        }
    }
}

fn summarize_impacts(results: &[QueryResult], limit: usize) -> Vec<StockImpact> {
    let mut best: BTreeMap<&str, &StockImpact> = BTreeMap::new();
    for impact in results.iter().flat_map(|r| r.stock_impacts.iter()) {
        let keep = best
            .get(impact.symbol.as_str())
            .is_none_or(|current| impact.confidence > current.confidence);
        if keep {
            best.insert(&impact.symbol, impact);
        }
    }

    let mut summary: Vec<StockImpact> = best.into_values().cloned().collect();
    summary.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    summary.truncate(limit);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use extract::{EntityKind, ImpactBasis, KeywordTable, NullTagger};
    use index::{InMemoryMetadataStore, InMemoryVectorIndex};
    use std::collections::BTreeSet;

    /// Every query lands on the same fixed vector.
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingPort for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    fn record(hour: u32, embedding: Vec<f32>, companies: &[&str], sectors: &[&str], impacts: &[(&str, f32, ImpactBasis)]) -> StoredRecord {
        let mut entities = EntitySet::default();
        for c in companies {
            entities.insert(EntityKind::Company, c);
        }
        for s in sectors {
            entities.insert(EntityKind::Sector, s);
        }
        let id = ArticleId::generate();
        StoredRecord {
            id,
            headline: format!("story {hour}"),
            content: "Banking stocks moved.".to_string(),
            source: "Wire".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 5, 2, hour, 0, 0).unwrap(),
            url: None,
            normalized_text: "story banking stocks moved.".to_string(),
            embedding,
            member_ids: BTreeSet::from([id]),
            sources: BTreeSet::from(["Wire".to_string()]),
            merged_text: "Banking stocks moved.".to_string(),
            entities,
            impacts: impacts
                .iter()
                .map(|(symbol, confidence, basis)| StockImpact {
                    symbol: symbol.to_string(),
                    confidence: *confidence,
                    basis: *basis,
                    reason: String::new(),
                })
                .collect(),
            stored_at: Utc::now(),
        }
    }

    async fn engine(query_vector: Vec<f32>, records: Vec<StoredRecord>) -> QueryEngine {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let vectors = Arc::new(InMemoryVectorIndex::new());
        for r in records {
            vectors.upsert(r.id, &r.embedding).await.unwrap();
            metadata.put(r).await.unwrap();
        }
        let extraction = EntityExtractionStage::new(Arc::new(NullTagger), Arc::new(KeywordTable::default())).unwrap();
        QueryEngine::new(Arc::new(FixedEmbedder(query_vector)), extraction, metadata, vectors, QueryConfig::default())
    }

    #[tokio::test]
    async fn test_direct_mention_outranks_sector_article() {
        let direct = record(8, vec![1.0, 0.0], &["HDFC Bank"], &[], &[("HDFCBANK", 1.0, ImpactBasis::Direct)]);
        let sector = record(12, vec![1.0, 0.0], &[], &["Banking"], &[("HDFCBANK", 0.6, ImpactBasis::Sector)]);
        let direct_id = direct.id;

        let engine = engine(vec![1.0, 0.0], vec![sector, direct]).await;
        let response = engine.query("HDFC Bank news", None).await.unwrap();

        assert_eq!(response.total_results, 2);
        assert_eq!(response.results[0].article_id, direct_id);
        assert!(response.results[0].relevance_score > response.results[1].relevance_score);
        assert!(response.results[0].reasoning.contains("HDFCBANK 1.00 (direct)"));
        assert!(response.entity_breakdown.contains(EntityKind::Company, "HDFC Bank"));
        assert_eq!(response.impact_summary[0].symbol, "HDFCBANK");
        assert_eq!(response.impact_summary[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn test_nothing_above_floor_is_empty() {
        let unrelated = record(9, vec![0.0, 1.0], &["Infosys"], &["IT"], &[]);
        let engine = engine(vec![1.0, 0.0], vec![unrelated]).await;

        let response = engine.query("monsoon forecast", Some(3)).await.unwrap();
        assert_eq!(response.total_results, 0);
        assert!(response.results.is_empty());
        assert!(response.reasoning.contains("relevance floor"));
    }

    #[tokio::test]
    async fn test_sector_expansion_pulls_company_records() {
        // Orthogonal vector: only entity expansion can surface it
        let icici = record(9, vec![0.0, 1.0], &["ICICI Bank"], &[], &[("ICICIBANK", 1.0, ImpactBasis::Direct)]);
        let engine = engine(vec![1.0, 0.0], vec![icici]).await;

        let response = engine.query("banking sector update", None).await.unwrap();
        assert_eq!(response.total_results, 1);
        let result = &response.results[0];
        assert!(result.paths.contains(&MatchPath::SectorExpansion));
        assert!(result.reasoning.contains("Banking via ICICI Bank"));
    }

    #[tokio::test]
    async fn test_ties_prefer_newest_and_limit_applies() {
        let records: Vec<StoredRecord> = (1..=4).map(|h| record(h, vec![1.0, 0.0], &[], &[], &[])).collect();
        let engine = engine(vec![1.0, 0.0], records).await;

        let response = engine.query("market wrap", Some(2)).await.unwrap();
        let headlines: Vec<&str> = response.results.iter().map(|r| r.headline.as_str()).collect();
        assert_eq!(headlines, vec!["story 4", "story 3"]);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let engine = engine(vec![1.0, 0.0], Vec::new()).await;
        let err = engine.query("   ", None).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
