//! External service traits the pipeline is written against.
//!
//! The core never talks to a network or filesystem itself: embedding,
//! transcription, completion, blob storage, and format extraction are
//! all reached through these traits. The app crate provides the real
//! providers (OpenAI, Deepgram, local blob directory, pdf-extract);
//! tests substitute deterministic in-process fakes.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::models::{ExtractionMetadata, FileType, WordSegment};

/// Text → fixed-dimensional vector, batched.
///
/// `embed_batch` must return one vector per input text, in input
/// order — the ingestion pipeline pairs chunks with vectors
/// positionally. Failures surface as
/// [`PipelineError::Embedding`]; there is no partial-result fallback.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;

    /// Embed a single query string.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| PipelineError::Embedding("empty embedding response".to_string()))
    }
}

/// Result of transcribing an audio document.
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Concatenated transcript text.
    pub text: String,
    /// Word-level segments with start/end times in seconds.
    pub words: Vec<WordSegment>,
    /// Source audio duration in seconds.
    pub duration_secs: f64,
}

/// Audio bytes → word-timestamped transcript.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mime: &str) -> Result<Transcript, PipelineError>;
}

/// Prompt → generated text.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, PipelineError>;
}

/// Raw uploaded bytes, addressed by an opaque reference.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes, returning a reference for later retrieval.
    async fn store(&self, bytes: &[u8], mime: &str) -> Result<String, PipelineError>;

    /// Fetch bytes by reference. An unknown reference is
    /// [`PipelineError::Storage`] naming it.
    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, PipelineError>;
}

/// Output of format-specific text extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub content: String,
    pub metadata: ExtractionMetadata,
}

/// Raw bytes + declared format → plain text and format metadata.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        bytes: &[u8],
        file_type: &FileType,
    ) -> Result<Extraction, PipelineError>;
}
