use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::prompt::build_retry_prompt;

/// Minimal Ollama `/api/generate` client, always asking for JSON output.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: GenerateOptions,
}

/// Tagging must be repeatable for the same article.
#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Raw completion text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            options: GenerateOptions { temperature: 0.0 },
        };

        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Ollama unreachable at {}", self.base_url))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Ollama generate returned {} for model {}", status, self.model);
        }

        let parsed: GenerateResponse = resp.json().await.context("Malformed Ollama generate body")?;
        Ok(parsed.response)
    }

    /// Completion decoded as `T`. A completion that does not decode is sent
    /// back for repair up to `max_repairs` times.
    pub async fn generate_json<T: DeserializeOwned>(&self, prompt: &str, max_repairs: usize) -> Result<T> {
        let mut completion = self.generate(prompt).await?;
        let mut repairs = 0;

        loop {
            match serde_json::from_str::<T>(&completion) {
                Ok(value) => return Ok(value),
                Err(e) if repairs >= max_repairs => {
                    return Err(e).with_context(|| {
                        format!("{} still produced invalid JSON after {} repairs", self.model, repairs)
                    });
                }
                Err(e) => {
                    repairs += 1;
                    warn!(model = %self.model, repair = repairs, error = %e, "invalid JSON from model, asking for repair");
                    completion = self.generate(&build_retry_prompt(&completion)).await?;
                }
            }
        }
    }
}
