use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use index::StoredRecord;
use ingest::{NewsError, RawArticle};
use pipeline::{BatchReport, PipelineOrchestrator, PipelineStats};
use query::QueryResponse;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineOrchestrator>,
    /// Base URLs probed by `/health`
    pub dependencies: Vec<(String, String)>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    dependencies: Vec<DependencyStatus>,
}

#[derive(Serialize)]
struct DependencyStatus {
    name: String,
    status: String,
}

#[derive(Deserialize)]
struct ImportRequest {
    path: String,
}

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

const MAX_PAGE: usize = 200;

fn default_limit() -> usize {
    20
}

pub struct ApiError(NewsError);

impl From<NewsError> for ApiError {
    fn from(err: NewsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NewsError::Validation(_) => StatusCode::BAD_REQUEST,
            NewsError::PortTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(error = %self.0, kind = self.0.kind(), "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string(), "kind": self.0.kind() });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/articles", post(ingest_articles).get(list_articles))
        .route("/articles/import", post(import_articles))
        .route("/query", post(run_query))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap_or_default();
    let mut dependencies = Vec::new();
    let mut healthy = true;

    for (name, url) in &state.dependencies {
        let status = probe(&client, url).await;
        healthy &= status == "ok";
        dependencies.push(DependencyStatus {
            name: name.clone(),
            status,
        });
    }

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        dependencies,
    })
}

async fn probe(client: &reqwest::Client, url: &str) -> String {
    match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {}", e),
    }
}

async fn ingest_articles(
    State(state): State<Arc<AppState>>,
    Json(articles): Json<Vec<RawArticle>>,
) -> Json<BatchReport> {
    let ctx = state.pipeline.run_context();
    Json(state.pipeline.process_batch(articles, &ctx).await)
}

async fn import_articles(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<BatchReport>, ApiError> {
    let path = PathBuf::from(&req.path);
    if !path.exists() {
        return Err(NewsError::Validation(format!("{} does not exist", path.display())).into());
    }

    let articles = ingest::load_articles(&path).await.map_err(NewsError::Port)?;
    info!(path = %path.display(), articles = articles.len(), "importing articles");

    let ctx = state.pipeline.run_context();
    Ok(Json(state.pipeline.process_batch(articles, &ctx).await))
}

async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    Ok(Json(state.pipeline.query(&req.query, req.max_results).await?))
}

async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<StoredRecord>>, ApiError> {
    Ok(Json(state.pipeline.list_recent(params.limit.min(MAX_PAGE), params.offset).await?))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<PipelineStats>, ApiError> {
    Ok(Json(state.pipeline.stats().await?))
}
