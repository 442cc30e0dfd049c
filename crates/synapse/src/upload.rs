//! The `ingest` command: upload a local file and run it through the
//! pipeline.

use anyhow::{bail, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use synapse_core::error::PipelineError;
use synapse_core::ingest::{process_document, IngestOptions};
use synapse_core::models::{Document, DocumentStatus, FileType};
use synapse_core::services::{BlobStore, Transcriber};
use synapse_core::store::DocumentStore;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::extract::{mime_for_extension, SynapseExtractor};
use crate::sqlite_store::SqliteStore;
use crate::storage::LocalBlobStore;
use crate::transcription::{DeepgramTranscriber, UnavailableTranscriber};

pub async fn run_ingest(config: &Config, file: &Path, title: Option<String>) -> Result<()> {
    let bytes = std::fs::read(file)?;
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let Some(mime) = mime_for_extension(ext) else {
        bail!(
            "unsupported file format: .{ext} — supported: pdf, md, txt, mp3, wav, m4a, ogg, flac"
        );
    };
    let file_type = FileType::from_mime(mime)
        .ok_or_else(|| PipelineError::UnsupportedFormat(mime.to_string()))?;

    let title = title.unwrap_or_else(|| {
        file.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string()
    });

    let pool = db::connect(&config.db.path).await?;
    let store = SqliteStore::new(pool);
    let blobs = LocalBlobStore::new(config.storage.blob_dir.clone());

    let blob_ref = blobs.store(&bytes, mime).await?;
    let now = Utc::now().timestamp();
    let document = Document {
        id: Uuid::new_v4().to_string(),
        title,
        file_type: file_type.clone(),
        size_bytes: bytes.len() as u64,
        blob_ref,
        status: DocumentStatus::Uploaded,
        processing_progress: 0,
        content: None,
        metadata: None,
        audio_duration: None,
        error: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_document(&document).await?;
    println!("Uploaded {} ({} bytes) as {}", document.title, document.size_bytes, document.id);

    let transcriber: Arc<dyn Transcriber> = if file_type.is_audio() {
        Arc::new(DeepgramTranscriber::new(&config.transcription)?)
    } else {
        Arc::new(UnavailableTranscriber)
    };
    let extractor = SynapseExtractor::new(transcriber);
    let embedder = create_embedder(&config.embedding)?;

    let options = IngestOptions {
        chunker: config.chunking.to_chunker(),
    };
    let report = process_document(
        &store,
        &blobs,
        &extractor,
        embedder.as_ref(),
        &options,
        &document.id,
    )
    .await?;

    println!(
        "Processed: {} chunks from {} characters",
        report.chunk_count, report.content_chars
    );
    Ok(())
}
