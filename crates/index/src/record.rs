use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use dedup::MergedArticle;
use extract::{EntitySet, StockImpact};
use ingest::ArticleId;

/// A deduplicated, tagged article as persisted in both stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: ArticleId,
    pub headline: String,
    pub content: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
    pub normalized_text: String,
    pub embedding: Vec<f32>,
    pub member_ids: BTreeSet<ArticleId>,
    pub sources: BTreeSet<String>,
    pub merged_text: String,
    pub entities: EntitySet,
    pub impacts: Vec<StockImpact>,
    pub stored_at: DateTime<Utc>,
}

impl StoredRecord {
    pub fn from_merged(merged: &MergedArticle, entities: EntitySet, impacts: Vec<StockImpact>) -> Self {
        let rep = &merged.representative;
        Self {
            id: rep.id,
            headline: rep.headline.clone(),
            content: rep.content.clone(),
            source: rep.source.clone(),
            published_at: rep.published_at,
            url: rep.url.clone(),
            normalized_text: rep.normalized_text.clone(),
            embedding: rep.embedding.clone(),
            member_ids: merged.member_ids.clone(),
            sources: merged.sources.clone(),
            merged_text: merged.merged_text.clone(),
            entities,
            impacts,
            stored_at: Utc::now(),
        }
    }

    /// Leading slice of the content, cut on a word boundary.
    pub fn summary(&self, max_chars: usize) -> String {
        let content = self.content.trim();
        if content.chars().count() <= max_chars {
            return content.to_string();
        }

        let cut: String = content.chars().take(max_chars).collect();
        let cut = match cut.rfind(char::is_whitespace) {
            Some(pos) if pos > 0 => &cut[..pos],
            _ => cut.as_str(),
        };
        format!("{}...", cut.trim_end())
    }
}

/// Newest first; id breaks ties so pagination is stable.
pub fn sort_recent(records: &mut [StoredRecord]) {
    records.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(a.id.cmp(&b.id)));
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_cuts_on_word_boundary() {
        let mut record = fixtures::record(9, &[], &[]);
        record.content = "HDFC Bank reported strong quarterly earnings today".to_string();

        assert_eq!(record.summary(200), record.content);
        assert_eq!(record.summary(20), "HDFC Bank reported...");
    }

    #[test]
    fn test_sort_recent() {
        let mut records = vec![fixtures::record(8, &[], &[]), fixtures::record(11, &[], &[]), fixtures::record(9, &[], &[])];
        sort_recent(&mut records);
        let headlines: Vec<&str> = records.iter().map(|r| r.headline.as_str()).collect();
        assert_eq!(headlines, vec!["headline 11", "headline 9", "headline 8"]);
    }
}
