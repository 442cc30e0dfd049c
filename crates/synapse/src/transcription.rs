//! Audio transcription via the Deepgram API.
//!
//! Uploads the raw audio bytes to `POST /v1/listen` with word-level
//! timestamps enabled and turns the best alternative into a
//! [`Transcript`]. Transient failures (429, 5xx, network) retry with
//! the same exponential backoff as the embedding providers; other 4xx
//! responses fail immediately.

use async_trait::async_trait;
use std::time::Duration;

use synapse_core::error::PipelineError;
use synapse_core::models::WordSegment;
use synapse_core::services::{Transcriber, Transcript};

use crate::config::TranscriptionConfig;

pub struct DeepgramTranscriber {
    model: String,
    url: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl DeepgramTranscriber {
    pub fn new(config: &TranscriptionConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("DEEPGRAM_API_KEY")
            .map_err(|_| anyhow::anyhow!("DEEPGRAM_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            url: config.url.clone(),
            api_key,
            client,
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/listen?model={}&punctuate=true&paragraphs=true&diarize=true&smart_format=true",
            self.url, self.model
        )
    }
}

/// Pull the transcript and word timings out of a Deepgram response.
fn parse_response(json: &serde_json::Value) -> Result<Transcript, PipelineError> {
    let alternative = json
        .pointer("/results/channels/0/alternatives/0")
        .ok_or_else(|| {
            PipelineError::Transcription("response contains no usable alternative".to_string())
        })?;

    let text = alternative
        .get("transcript")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();
    if text.trim().is_empty() {
        return Err(PipelineError::Transcription(
            "transcript is empty".to_string(),
        ));
    }

    let words = alternative
        .get("words")
        .and_then(|w| w.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|w| {
                    Some(WordSegment {
                        text: w.get("word")?.as_str()?.to_string(),
                        start: w.get("start")?.as_f64()?,
                        end: w.get("end")?.as_f64()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let duration_secs = json
        .pointer("/metadata/duration")
        .and_then(|d| d.as_f64())
        .unwrap_or_default();

    Ok(Transcript {
        text,
        words,
        duration_secs,
    })
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    async fn transcribe(&self, audio: &[u8], mime: &str) -> Result<Transcript, PipelineError> {
        let endpoint = self.endpoint();
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&endpoint)
                .header("Authorization", format!("Token {}", self.api_key))
                .header("Content-Type", mime)
                .body(audio.to_vec())
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| PipelineError::Transcription(e.to_string()))?;
                        return parse_response(&json);
                    }
                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(PipelineError::Transcription(format!(
                            "Deepgram API error {status}: {body_text}"
                        )));
                        continue;
                    }
                    return Err(PipelineError::Transcription(format!(
                        "Deepgram API error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(PipelineError::Transcription(e.to_string()));
                    continue;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            PipelineError::Transcription("transcription failed after retries".to_string())
        }))
    }
}

/// Stand-in used when no transcription backend is configured; only
/// audio ingestion ever calls it.
pub struct UnavailableTranscriber;

#[async_trait]
impl Transcriber for UnavailableTranscriber {
    async fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<Transcript, PipelineError> {
        Err(PipelineError::Transcription(
            "no transcription backend configured (set DEEPGRAM_API_KEY)".to_string(),
        ))
    }
}
