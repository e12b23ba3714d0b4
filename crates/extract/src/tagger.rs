use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::OllamaClient;
use crate::prompt::build_tagging_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanKind {
    Person,
    Organization,
}

/// A named-entity mention reported by a tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "type")]
    pub kind: SpanKind,
    pub text: String,
}

impl Span {
    pub fn person(text: impl Into<String>) -> Self {
        Self { kind: SpanKind::Person, text: text.into() }
    }

    pub fn organization(text: impl Into<String>) -> Self {
        Self { kind: SpanKind::Organization, text: text.into() }
    }
}

/// Named-entity tagger consumed by the extraction stage.
#[async_trait]
pub trait EntityExtractorPort: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<Span>>;
}

/// Tagger that finds nothing; keyword matching alone drives extraction.
pub struct NullTagger;

#[async_trait]
impl EntityExtractorPort for NullTagger {
    async fn extract(&self, _text: &str) -> Result<Vec<Span>> {
        Ok(Vec::new())
    }
}

#[derive(Deserialize)]
struct TaggerOutput {
    #[serde(default)]
    entities: Vec<Span>,
}

/// LLM-backed tagger speaking the Ollama generate API.
pub struct OllamaTagger {
    llm: OllamaClient,
}

impl OllamaTagger {
    pub fn new(llm: OllamaClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl EntityExtractorPort for OllamaTagger {
    async fn extract(&self, text: &str) -> Result<Vec<Span>> {
        let prompt = build_tagging_prompt(text);

        let output: TaggerOutput = self
            .llm
            .generate_json(&prompt, 1)
            .await
            .context("Failed to tag entities")?;

        Ok(output
            .entities
            .into_iter()
            .filter(|span| !span.text.trim().is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ollama_body(response: &str) -> serde_json::Value {
        serde_json::json!({ "response": response })
    }

    #[tokio::test]
    async fn test_parses_tagged_spans() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ollama_body(
                r#"{"entities":[{"type":"ORGANIZATION","text":"HDFC Bank"},{"type":"PERSON","text":"Sashidhar Jagdishan"},{"type":"PERSON","text":"  "}]}"#,
            )))
            .mount(&server)
            .await;

        let tagger = OllamaTagger::new(OllamaClient::new(server.uri(), "llama3"));
        let spans = tagger.extract("HDFC Bank CEO Sashidhar Jagdishan said").await.unwrap();

        assert_eq!(
            spans,
            vec![Span::organization("HDFC Bank"), Span::person("Sashidhar Jagdishan")]
        );
    }

    #[tokio::test]
    async fn test_repairs_invalid_json_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ollama_body("not json")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ollama_body(r#"{"entities":[]}"#)))
            .mount(&server)
            .await;

        let tagger = OllamaTagger::new(OllamaClient::new(server.uri(), "llama3"));
        assert!(tagger.extract("quiet day").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tagger = OllamaTagger::new(OllamaClient::new(server.uri(), "llama3"));
        assert!(tagger.extract("anything").await.is_err());
    }
}
