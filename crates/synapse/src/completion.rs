//! Chat completions via the OpenAI API.
//!
//! `POST /v1/chat/completions` with a system and user message, the
//! personality's temperature, and an optional token cap. Retry policy
//! matches the other providers: 429/5xx/network retry with exponential
//! backoff, other 4xx fail immediately.

use async_trait::async_trait;
use std::time::Duration;

use synapse_core::error::PipelineError;
use synapse_core::services::CompletionModel;

use crate::config::CompletionConfig;

pub struct OpenAiCompletion {
    model: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAiCompletion {
    pub fn new(config: &CompletionConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }
}

fn parse_response(json: &serde_json::Value) -> Result<String, PipelineError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            PipelineError::Completion("invalid OpenAI response: missing message content".to_string())
        })
}

#[async_trait]
impl CompletionModel for OpenAiCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, PipelineError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "temperature": temperature,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });
        if let Some(cap) = max_tokens {
            body["max_tokens"] = serde_json::json!(cap);
        }

        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/chat/completions")
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
                            .map_err(|e| PipelineError::Completion(e.to_string()))?;
                        return parse_response(&json);
                    }
                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(PipelineError::Completion(format!(
                            "OpenAI API error {status}: {body_text}"
                        )));
                        continue;
                    }
                    return Err(PipelineError::Completion(format!(
                        "OpenAI API error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(PipelineError::Completion(e.to_string()));
                    continue;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            PipelineError::Completion("completion failed after retries".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_content_is_extracted() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "It rises."}}]
        });
        assert_eq!(parse_response(&json).unwrap(), "It rises.");
    }

    #[test]
    fn missing_content_is_a_completion_error() {
        let json = serde_json::json!({"choices": []});
        assert!(matches!(
            parse_response(&json),
            Err(PipelineError::Completion(_))
        ));
    }
}
