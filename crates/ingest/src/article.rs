use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier handed out once per ingested article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub headline: String,
    pub content: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RawArticle {
    pub fn new(
        headline: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            headline: headline.into(),
            content: content.into(),
            source: source.into(),
            published_at,
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalArticle {
    pub id: ArticleId,
    pub headline: String,
    pub content: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub url: Option<String>,
    /// Lowercased, whitespace-collapsed headline + content; used for matching only
    pub normalized_text: String,
    pub embedding: Vec<f32>,
}

impl CanonicalArticle {
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Headline and content as shown to readers
    pub fn display_text(&self) -> String {
        format!("{}\n{}", self.headline, self.content)
    }
}
