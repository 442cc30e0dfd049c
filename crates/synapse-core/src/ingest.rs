//! Ingestion orchestrator: blob → text → chunks → embeddings → store.
//!
//! [`process_document`] drives one document through the full pipeline
//! and is the single place ingestion failures are handled: any step
//! error is recorded onto the document (`status = failed`, the message
//! in `error`) and then returned to the caller unchanged. Progress is
//! written at fixed milestones (25 after extraction, 50 after
//! chunking, 50–90 through embedding persistence, 100 on completion)
//! so a poller sees monotonic advance.

use uuid::Uuid;

use crate::chunk::{chunk_text_with, ChunkerConfig, DraftChunk};
use crate::error::PipelineError;
use crate::models::{ContentChunk, Document, ExtractionMetadata};
use crate::services::{BlobStore, Embedder, Extraction, Extractor};
use crate::store::DocumentStore;

/// Tunables for one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub chunker: ChunkerConfig,
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
    /// Length of the normalized extracted text, in characters.
    pub content_chars: usize,
}

/// Run the full ingestion pipeline for an uploaded document.
///
/// Exactly one of several concurrent calls for the same document wins
/// the transition into `processing`; the rest fail with
/// [`PipelineError::AlreadyProcessing`] without touching the winner's
/// run. A document already in a terminal state is also rejected this
/// way — re-ingestion requires a fresh upload.
pub async fn process_document(
    store: &dyn DocumentStore,
    blobs: &dyn BlobStore,
    extractor: &dyn Extractor,
    embedder: &dyn Embedder,
    options: &IngestOptions,
    document_id: &str,
) -> Result<IngestReport, PipelineError> {
    let document = store
        .get_document(document_id)
        .await?
        .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;

    if !store.begin_processing(document_id).await? {
        return Err(PipelineError::AlreadyProcessing(document_id.to_string()));
    }

    tracing::info!(document_id, title = %document.title, "ingestion started");
    match run_pipeline(store, blobs, extractor, embedder, options, &document).await {
        Ok(report) => {
            store.mark_completed(document_id).await?;
            tracing::info!(document_id, chunks = report.chunk_count, "ingestion completed");
            Ok(report)
        }
        Err(err) => {
            let message = err.to_string();
            tracing::warn!(document_id, error = %message, "ingestion failed");
            if let Err(store_err) = store.mark_failed(document_id, &message).await {
                tracing::error!(document_id, error = %store_err, "failed to record failure");
            }
            Err(err)
        }
    }
}

async fn run_pipeline(
    store: &dyn DocumentStore,
    blobs: &dyn BlobStore,
    extractor: &dyn Extractor,
    embedder: &dyn Embedder,
    options: &IngestOptions,
    document: &Document,
) -> Result<IngestReport, PipelineError> {
    let bytes = blobs.fetch(&document.blob_ref).await?;

    let Extraction { content, metadata } = extractor.extract(&bytes, &document.file_type).await?;
    store.set_progress(&document.id, 25).await?;

    let segments = match &metadata {
        ExtractionMetadata::Audio { words, .. } => Some(words.as_slice()),
        _ => None,
    };
    let drafts = chunk_text_with(&options.chunker, &content, segments);
    store.set_progress(&document.id, 50).await?;
    tracing::debug!(
        document_id = %document.id,
        chunks = drafts.len(),
        chars = content.chars().count(),
        "extraction and chunking done"
    );

    let vectors = embed_drafts(embedder, &drafts).await?;
    let total = drafts.len();
    for (i, (draft, embedding)) in drafts.into_iter().zip(vectors).enumerate() {
        let chunk = ContentChunk {
            id: Uuid::new_v4().to_string(),
            document_id: document.id.clone(),
            index: draft.index,
            content: draft.content,
            embedding,
            metadata: draft.metadata,
        };
        store.insert_chunk(&chunk).await?;
        let progress = 50 + (((i + 1) * 40) / total) as u8;
        store.set_progress(&document.id, progress).await?;
    }

    let audio_duration = match &metadata {
        ExtractionMetadata::Audio { duration_secs, .. } => Some(*duration_secs),
        _ => None,
    };
    store
        .set_content(&document.id, &content, &metadata, audio_duration)
        .await?;

    Ok(IngestReport {
        document_id: document.id.clone(),
        chunk_count: total,
        content_chars: content.chars().count(),
    })
}

/// Embed every draft in one batch, insisting on a vector per chunk.
async fn embed_drafts(
    embedder: &dyn Embedder,
    drafts: &[DraftChunk],
) -> Result<Vec<Vec<f32>>, PipelineError> {
    if drafts.is_empty() {
        return Ok(Vec::new());
    }
    let texts: Vec<String> = drafts.iter().map(|d| d.content.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    if vectors.len() != drafts.len() {
        return Err(PipelineError::Embedding(format!(
            "expected {} vectors, got {}",
            drafts.len(),
            vectors.len()
        )));
    }
    Ok(vectors)
}
