use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::{DuplicateCluster, MergePolicy, MergedArticle};
use ingest::{CanonicalArticle, cosine_similarity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Minimum cosine similarity to a representative for two articles to merge
    pub similarity_threshold: f32,
    /// A later article replaces the representative once its content is this many times longer
    pub material_length_ratio: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            material_length_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// In formation order
    pub clusters: Vec<DuplicateCluster>,
    /// One per cluster, same order as `clusters`
    pub merged: Vec<MergedArticle>,
}

impl DedupOutcome {
    pub fn deduplicated_away(&self) -> usize {
        self.clusters.iter().map(|c| c.len().saturating_sub(1)).sum()
    }
}

/// Greedy single-pass clustering over article embeddings.
pub struct Deduplicator {
    config: DedupConfig,
}

struct WorkingCluster {
    representative: usize,
    members: Vec<usize>,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Partition `articles` so that every article lands in exactly one cluster.
    pub fn cluster(&self, articles: &[CanonicalArticle]) -> DedupOutcome {
        let mut clusters: Vec<WorkingCluster> = Vec::new();

        for (idx, article) in articles.iter().enumerate() {
            // Strict `>` keeps the earliest-formed cluster on equal similarity
            let mut best: Option<(usize, f32)> = None;
            for (cluster_idx, cluster) in clusters.iter().enumerate() {
                let similarity = cosine_similarity(
                    &article.embedding,
                    &articles[cluster.representative].embedding,
                );
                if best.is_none_or(|(_, s)| similarity > s) {
                    best = Some((cluster_idx, similarity));
                }
            }

            match best {
                Some((cluster_idx, similarity)) if similarity >= self.config.similarity_threshold => {
                    let cluster = &mut clusters[cluster_idx];
                    cluster.members.push(idx);

                    let current = &articles[cluster.representative];
                    if self.prefers(article, current) {
                        debug!(
                            new = %article.id,
                            old = %current.id,
                            "representative replaced"
                        );
                        cluster.representative = idx;
                    }

                    debug!(
                        article = %article.id,
                        cluster = cluster_idx,
                        similarity,
                        "article merged into cluster"
                    );
                }
                _ => clusters.push(WorkingCluster {
                    representative: idx,
                    members: vec![idx],
                }),
            }
        }

        let mut out_clusters = Vec::with_capacity(clusters.len());
        let mut merged = Vec::with_capacity(clusters.len());

        for cluster in &clusters {
            let representative = &articles[cluster.representative];
            let others: Vec<&CanonicalArticle> = cluster
                .members
                .iter()
                .filter(|&&i| i != cluster.representative)
                .map(|&i| &articles[i])
                .collect();

            out_clusters.push(DuplicateCluster {
                representative_id: representative.id,
                member_ids: cluster.members.iter().map(|&i| articles[i].id).collect(),
                merge_policy: MergePolicy::UnionOfFields,
            });
            merged.push(MergedArticle::from_members(representative, &others));
        }

        DedupOutcome {
            clusters: out_clusters,
            merged,
        }
    }

    /// Earliest publication wins unless the other article is materially longer.
    fn prefers(&self, candidate: &CanonicalArticle, current: &CanonicalArticle) -> bool {
        let ratio = self.config.material_length_ratio as f64;
        let candidate_len = candidate.content_len() as f64;
        let current_len = current.content_len() as f64;

        if candidate_len >= current_len * ratio {
            return true;
        }
        if current_len >= candidate_len * ratio {
            return false;
        }
        candidate.published_at < current.published_at
    }
}
