use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::article::{ArticleId, CanonicalArticle, RawArticle};
use crate::embedding::EmbeddingPort;
use crate::error::{NewsError, bounded};
use crate::normalizer::matching_text;

/// Validates raw input and attaches an id, normalized text and embedding.
#[derive(Clone)]
pub struct IngestionStage {
    embedder: Arc<dyn EmbeddingPort>,
    dimension: usize,
}

impl IngestionStage {
    pub fn new(embedder: Arc<dyn EmbeddingPort>, dimension: usize) -> Self {
        Self { embedder, dimension }
    }

    pub fn validate(raw: &RawArticle) -> Result<(), NewsError> {
        if raw.headline.trim().is_empty() {
            return Err(NewsError::Validation("headline is empty".to_string()));
        }
        if raw.content.trim().is_empty() {
            return Err(NewsError::Validation(format!(
                "content is empty for '{}'",
                raw.headline.trim()
            )));
        }
        Ok(())
    }

    pub async fn ingest(
        &self,
        raw: &RawArticle,
        timeout: Duration,
    ) -> Result<CanonicalArticle, NewsError> {
        Self::validate(raw)?;

        let normalized_text = matching_text(&raw.headline, &raw.content);
        let embedding = bounded("embedding", timeout, self.embedder.embed(&normalized_text)).await?;

        if embedding.len() != self.dimension {
            return Err(NewsError::Port(anyhow::anyhow!(
                "embedding dimension {} does not match configured {}",
                embedding.len(),
                self.dimension
            )));
        }

        let article = CanonicalArticle {
            id: ArticleId::generate(),
            headline: raw.headline.clone(),
            content: raw.content.clone(),
            source: raw.source.clone(),
            published_at: raw.published_at,
            url: raw.url.clone(),
            normalized_text,
            embedding,
        };

        debug!(id = %article.id, source = %article.source, "article ingested");
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct LengthEmbedder {
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingPort for LengthEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let mut v = vec![0.0; self.dimension];
            v[0] = text.len() as f32;
            Ok(v)
        }
    }

    fn raw(headline: &str, content: &str) -> RawArticle {
        RawArticle::new(
            headline,
            content,
            "Mint",
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_ingest_preserves_original_text() {
        let stage = IngestionStage::new(Arc::new(LengthEmbedder { dimension: 4 }), 4);
        let article = stage
            .ingest(&raw("HDFC Bank  Q3", "Profit ROSE 18%"), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(article.headline, "HDFC Bank  Q3");
        assert_eq!(article.content, "Profit ROSE 18%");
        assert_eq!(article.normalized_text, "hdfc bank q3 profit rose 18%");
        assert_eq!(article.embedding.len(), 4);
    }

    #[tokio::test]
    async fn test_rejects_empty_fields() {
        let stage = IngestionStage::new(Arc::new(LengthEmbedder { dimension: 4 }), 4);

        let err = stage
            .ingest(&raw("   ", "body"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");

        let err = stage
            .ingest(&raw("Headline", "\n\t"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_port_error() {
        let stage = IngestionStage::new(Arc::new(LengthEmbedder { dimension: 3 }), 4);
        let err = stage
            .ingest(&raw("Headline", "body"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "port");
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let stage = IngestionStage::new(Arc::new(LengthEmbedder { dimension: 2 }), 2);
        let a = stage.ingest(&raw("A", "body"), Duration::from_secs(1)).await.unwrap();
        let b = stage.ingest(&raw("A", "body"), Duration::from_secs(1)).await.unwrap();
        assert_ne!(a.id, b.id);
    }
}
