use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::ports::VectorIndexPort;
use ingest::ArticleId;

/// Vector index backed by Qdrant's REST API. Point ids are the article UUIDs.
pub struct QdrantVectorIndex {
    base_url: String,
    client: reqwest::Client,
    collection_name: String,
    dimension: usize,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: String,
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct DeletePoints {
    points: Vec<String>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct CollectionInfo {
    result: CollectionResult,
}

#[derive(Deserialize)]
struct CollectionResult {
    collections: Vec<Collection>,
}

#[derive(Deserialize)]
struct Collection {
    name: String,
}

impl QdrantVectorIndex {
    pub fn new(base_url: impl Into<String>, collection_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            collection_name: collection_name.into(),
            dimension,
        }
    }

    /// Create the collection with cosine distance unless it already exists.
    pub async fn ensure_collection(&self) -> Result<()> {
        let url = format!("{}/collections", self.base_url);
        let response = self.client.get(&url).send().await
            .context("Failed to reach Qdrant")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to list collections: {}", response.status());
        }

        let info: CollectionInfo = response.json().await?;
        let exists = info.result.collections.iter()
            .any(|c| c.name == self.collection_name);

        if exists {
            info!(collection = %self.collection_name, "Qdrant collection already exists");
            return Ok(());
        }

        let url = format!("{}/collections/{}", self.base_url, self.collection_name);
        let create_req = CreateCollection {
            vectors: VectorParams {
                size: self.dimension,
                distance: "Cosine".to_string(),
            },
        };

        let response = self.client
            .put(&url)
            .json(&create_req)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to create collection: {}", error_text);
        }

        info!(collection = %self.collection_name, dimension = self.dimension, "Qdrant collection created");
        Ok(())
    }
}

#[async_trait]
impl VectorIndexPort for QdrantVectorIndex {
    async fn upsert(&self, id: ArticleId, vector: &[f32]) -> Result<()> {
        let mut payload = HashMap::new();
        payload.insert("article_id".to_string(), serde_json::json!(id.to_string()));

        let url = format!(
            "{}/collections/{}/points?wait=true",
            self.base_url, self.collection_name
        );
        let upsert_req = UpsertPoints {
            points: vec![Point {
                id: id.to_string(),
                vector: vector.to_vec(),
                payload,
            }],
        };

        let response = self.client
            .put(&url)
            .json(&upsert_req)
            .send()
            .await
            .context("Failed to send upsert to Qdrant")?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to upsert point: {}", error_text);
        }

        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(ArticleId, f32)>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection_name
        );
        let request = SearchRequest {
            vector,
            limit: k,
            with_payload: true,
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send search to Qdrant")?;

        if !response.status().is_success() {
            anyhow::bail!("Qdrant search failed: {}", response.status());
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Qdrant search response")?;

        Ok(body
            .result
            .into_iter()
            .filter_map(|point| {
                let raw = point
                    .payload
                    .get("article_id")
                    .and_then(|v| v.as_str())
                    .or_else(|| point.id.as_str())?;
                ArticleId::parse(raw).map(|id| (id, point.score))
            })
            .collect())
    }

    async fn delete(&self, id: ArticleId) -> Result<()> {
        let url = format!(
            "{}/collections/{}/points/delete?wait=true",
            self.base_url, self.collection_name
        );
        let response = self.client
            .post(&url)
            .json(&DeletePoints { points: vec![id.to_string()] })
            .send()
            .await
            .context("Failed to send delete to Qdrant")?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to delete point {}: {}", id, error_text);
        }

        Ok(())
    }
}
