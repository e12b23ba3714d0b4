mod routes;
mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use extract::{OllamaClient, OllamaTagger};
use index::{JsonFileMetadataStore, OllamaEmbedder, QdrantVectorIndex};
use pipeline::{PipelineOrchestrator, PipelinePorts};
use routes::AppState;
use settings::ServiceSettings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = ServiceSettings::from_env();
    let config = settings.pipeline_config().await?;
    info!(mode = ?config.mode, dimension = config.embedding_dimension, "pipeline config loaded");

    let embedder = OllamaEmbedder::new(&settings.ollama_url, &settings.embed_model);
    match embedder.probe_dimension().await {
        Ok(dimension) if dimension != config.embedding_dimension => {
            anyhow::bail!(
                "embedding model {} produces {} dimensions, config expects {}",
                settings.embed_model,
                dimension,
                config.embedding_dimension
            );
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "could not probe embedding model, continuing"),
    }

    let vectors = QdrantVectorIndex::new(
        &settings.qdrant_url,
        &settings.qdrant_collection,
        config.embedding_dimension,
    );
    vectors
        .ensure_collection()
        .await
        .context("Failed to initialize Qdrant collection")?;

    let metadata = JsonFileMetadataStore::open(&settings.data_dir).await?;
    let tagger = OllamaTagger::new(OllamaClient::new(&settings.ollama_url, &settings.tagger_model));

    let pipeline = PipelineOrchestrator::new(
        config,
        PipelinePorts {
            embedder: Arc::new(embedder),
            tagger: Arc::new(tagger),
            metadata: Arc::new(metadata),
            vectors: Arc::new(vectors),
        },
    )?;

    let app = routes::router(AppState {
        pipeline: Arc::new(pipeline),
        dependencies: vec![
            ("ollama".to_string(), settings.ollama_url.clone()),
            ("qdrant".to_string(), settings.qdrant_url.clone()),
        ],
    });

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
