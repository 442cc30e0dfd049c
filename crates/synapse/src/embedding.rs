//! Embedding providers.
//!
//! Two backends implement the core [`Embedder`] trait:
//! - **[`OpenAiEmbedder`]** — `POST /v1/embeddings`, requires `OPENAI_API_KEY`.
//! - **[`OllamaEmbedder`]** — `POST /api/embed` on a local Ollama instance.
//!
//! Both retry transient failures with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use synapse_core::error::PipelineError;
use synapse_core::services::Embedder;

use crate::config::EmbeddingConfig;

/// Instantiate the embedder named by `embedding.provider`.
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt - 1).min(5))
}

fn parse_embedding_array(value: &serde_json::Value) -> Result<Vec<f32>, PipelineError> {
    value
        .as_array()
        .ok_or_else(|| PipelineError::Embedding("embedding is not an array".to_string()))
        .map(|arr| arr.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
}

// ============ OpenAI ============

pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }

    fn parse_response(&self, json: &serde_json::Value) -> Result<Vec<Vec<f32>>, PipelineError> {
        let data = json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| {
                PipelineError::Embedding("invalid OpenAI response: missing data array".to_string())
            })?;
        data.iter()
            .map(|item| {
                let embedding = item.get("embedding").ok_or_else(|| {
                    PipelineError::Embedding(
                        "invalid OpenAI response: missing embedding".to_string(),
                    )
                })?;
                parse_embedding_array(embedding)
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| PipelineError::Embedding(e.to_string()))?;
                        return self.parse_response(&json);
                    }
                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(PipelineError::Embedding(format!(
                            "OpenAI API error {status}: {body_text}"
                        )));
                        continue;
                    }
                    // Client error (not 429) — don't retry
                    return Err(PipelineError::Embedding(format!(
                        "OpenAI API error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(PipelineError::Embedding(e.to_string()));
                    continue;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            PipelineError::Embedding("embedding failed after retries".to_string())
        }))
    }
}

// ============ Ollama ============

pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            dims: config.dims,
            url,
            client,
            max_retries: config.max_retries,
        })
    }

    fn parse_response(&self, json: &serde_json::Value) -> Result<Vec<Vec<f32>>, PipelineError> {
        json.get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                PipelineError::Embedding(
                    "invalid Ollama response: missing embeddings array".to_string(),
                )
            })?
            .iter()
            .map(parse_embedding_array)
            .collect()
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/embed", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| PipelineError::Embedding(e.to_string()))?;
                        return self.parse_response(&json);
                    }
                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(PipelineError::Embedding(format!(
                            "Ollama API error {status}: {body_text}"
                        )));
                        continue;
                    }
                    return Err(PipelineError::Embedding(format!(
                        "Ollama API error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(PipelineError::Embedding(format!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url, e
                    )));
                    continue;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            PipelineError::Embedding("Ollama embedding failed after retries".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential_and_capped() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(6), Duration::from_secs(32));
        assert_eq!(backoff_delay(10), Duration::from_secs(32));
    }

    #[test]
    fn ollama_response_parses_in_order() {
        let cfg = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "m".to_string(),
            dims: 2,
            url: None,
            max_retries: 0,
            timeout_secs: 1,
        };
        let embedder = OllamaEmbedder::new(&cfg).unwrap();
        let json = serde_json::json!({"embeddings": [[1.0, 2.0], [3.0, 4.0]]});
        let parsed = embedder.parse_response(&json).unwrap();
        assert_eq!(parsed, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }
}
