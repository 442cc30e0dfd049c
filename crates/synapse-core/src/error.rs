//! Error types for the Synapse pipeline.
//!
//! Ingestion steps return `Result<_, PipelineError>` and the
//! orchestrator is the single top-level handler: it records the failure
//! onto the document (`status = failed`, `error = message`) and then
//! re-returns the error to the caller. Nothing in the pipeline retries
//! or swallows errors; at-most-once execution per invocation.

use thiserror::Error;

/// Failures raised by the ingestion and grounding pipelines.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Declared MIME type is outside the supported set.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Blob reference could not be resolved to stored bytes.
    #[error("storage error: {0}")]
    Storage(String),

    /// Format-specific extraction failed (bad PDF, undecodable text).
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Transcription service returned no usable transcript.
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// Embedding service call failed; no partial-result fallback.
    #[error("embedding service error: {0}")]
    Embedding(String),

    /// Completion service call failed.
    #[error("completion service error: {0}")]
    Completion(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("chat session not found: {0}")]
    SessionNotFound(String),

    /// A second ingestion run was triggered while one is in flight.
    #[error("document {0} is already being processed")]
    AlreadyProcessing(String),

    /// Storage backend failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures inside a [`DocumentStore`](crate::store::DocumentStore)
/// backend. Kept separate from [`PipelineError`] so store
/// implementations do not depend on pipeline semantics.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Wrap any backend error (sqlx, poisoned lock, …) by message.
    pub fn backend(err: impl std::fmt::Display) -> StoreError {
        StoreError::Backend(err.to_string())
    }
}
