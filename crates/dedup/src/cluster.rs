use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use ingest::{ArticleId, CanonicalArticle};

/// How member fields are combined into the surviving record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    #[default]
    UnionOfFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    pub representative_id: ArticleId,
    /// Always contains the representative
    pub member_ids: BTreeSet<ArticleId>,
    pub merge_policy: MergePolicy,
}

impl DuplicateCluster {
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}

/// One cluster collapsed into a single record.
#[derive(Debug, Clone)]
pub struct MergedArticle {
    pub representative: CanonicalArticle,
    pub member_ids: BTreeSet<ArticleId>,
    pub sources: BTreeSet<String>,
    /// Representative text first, then each distinct member text in input order
    pub merged_text: String,
    pub earliest_published_at: DateTime<Utc>,
}

impl MergedArticle {
    pub fn id(&self) -> ArticleId {
        self.representative.id
    }

    /// Members that were folded into the representative.
    pub fn duplicate_ids(&self) -> impl Iterator<Item = ArticleId> + '_ {
        let rep = self.representative.id;
        self.member_ids.iter().copied().filter(move |id| *id != rep)
    }

    pub(crate) fn from_members(representative: &CanonicalArticle, members: &[&CanonicalArticle]) -> Self {
        let mut seen_texts = BTreeSet::new();
        let mut parts = Vec::new();

        for article in std::iter::once(representative).chain(members.iter().copied()) {
            if seen_texts.insert(article.normalized_text.as_str()) {
                parts.push(article.display_text());
            }
        }

        let earliest_published_at = members
            .iter()
            .map(|a| a.published_at)
            .chain(std::iter::once(representative.published_at))
            .min()
            .unwrap_or(representative.published_at);

        Self {
            representative: representative.clone(),
            member_ids: members.iter().map(|a| a.id).chain(std::iter::once(representative.id)).collect(),
            sources: members.iter().map(|a| a.source.clone()).chain(std::iter::once(representative.source.clone())).collect(),
            merged_text: parts.join("\n\n"),
            earliest_published_at,
        }
    }
}
