//! End-to-end pipeline test over the real SQLite store, local blob
//! storage, and extractor, with deterministic in-process stand-ins for
//! the embedding, transcription, and completion services.

use async_trait::async_trait;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;

use synapse::extract::SynapseExtractor;
use synapse::migrate::run_migrations;
use synapse::sqlite_store::SqliteStore;
use synapse::storage::LocalBlobStore;

use synapse_core::error::PipelineError;
use synapse_core::ground::{answer, GroundingOptions};
use synapse_core::ingest::{process_document, IngestOptions};
use synapse_core::models::{
    ChatSession, Document, DocumentStatus, FileType, MessageRole, WordSegment,
};
use synapse_core::prompt::{personality, DEFAULT_PERSONALITY};
use synapse_core::services::{BlobStore, CompletionModel, Embedder, Transcriber, Transcript};
use synapse_core::store::DocumentStore;

/// Unit vectors derived from a cheap content hash; identical text
/// always embeds identically, different text usually differs.
struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-test"
    }

    fn dims(&self) -> usize {
        4
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut acc = [1.0f32; 4];
                for (i, b) in t.bytes().enumerate() {
                    acc[i % 4] += b as f32 / 255.0;
                }
                let norm = acc.iter().map(|x| x * x).sum::<f32>().sqrt();
                acc.iter().map(|x| x / norm).collect()
            })
            .collect())
    }
}

struct FixedTranscriber(Transcript);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<Transcript, PipelineError> {
        Ok(self.0.clone())
    }
}

struct CannedModel(&'static str);

#[async_trait]
impl CompletionModel for CannedModel {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _temperature: f32,
        _max_tokens: Option<u32>,
    ) -> Result<String, PipelineError> {
        Ok(self.0.to_string())
    }
}

struct Harness {
    store: SqliteStore,
    blobs: LocalBlobStore,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("synapse.db");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    Harness {
        store: SqliteStore::new(pool),
        blobs: LocalBlobStore::new(dir.path().join("blobs")),
        _dir: dir,
    }
}

async fn upload(h: &Harness, id: &str, bytes: &[u8], file_type: FileType) -> Document {
    let blob_ref = h.blobs.store(bytes, file_type.mime()).await.unwrap();
    let doc = Document {
        id: id.to_string(),
        title: "test doc".to_string(),
        file_type,
        size_bytes: bytes.len() as u64,
        blob_ref,
        status: DocumentStatus::Uploaded,
        processing_progress: 0,
        content: None,
        metadata: None,
        audio_duration: None,
        error: None,
        created_at: 1,
        updated_at: 1,
    };
    h.store.insert_document(&doc).await.unwrap();
    doc
}

fn study_text() -> String {
    let topics = [
        "Entropy measures the number of microstates available to a system",
        "Enthalpy tracks the heat content of a process at constant pressure",
        "Gibbs free energy combines both to predict spontaneity",
        "The second law states that total entropy never decreases",
        "Heat engines are bounded by the Carnot efficiency",
        "Phase transitions absorb or release latent heat",
    ];
    let mut out = String::new();
    for topic in topics.iter().cycle().take(40) {
        out.push_str(topic);
        out.push_str(". ");
    }
    out.trim_end().to_string()
}

#[tokio::test]
async fn markdown_ingest_then_grounded_ask() {
    let h = harness().await;
    let markdown = format!("# Thermodynamics\n\n{}", study_text());
    upload(&h, "d1", markdown.as_bytes(), FileType::Markdown).await;

    let extractor = SynapseExtractor::new(Arc::new(FixedTranscriber(Transcript {
        text: String::new(),
        words: vec![],
        duration_secs: 0.0,
    })));
    let report = process_document(
        &h.store,
        &h.blobs,
        &extractor,
        &HashEmbedder,
        &IngestOptions::default(),
        "d1",
    )
    .await
    .unwrap();
    assert!(report.chunk_count >= 2);

    let doc = h.store.get_document("d1").await.unwrap().unwrap();
    assert_eq!(doc.status, DocumentStatus::Completed);
    assert_eq!(doc.processing_progress, 100);
    // Heading marker stripped by extraction.
    assert!(doc.content.as_deref().unwrap().starts_with("Thermodynamics"));

    let chunks = h.store.document_chunks("d1").await.unwrap();
    assert_eq!(chunks.len(), report.chunk_count);
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.index, i);
        assert!(c.content.chars().count() >= 100);
        assert_eq!(c.embedding.len(), 4);
    }

    // Ask a question grounded in the stored chunks.
    let out = answer(
        &h.store,
        &HashEmbedder,
        &CannedModel("Entropy counts microstates. [Chunk 1]"),
        &GroundingOptions::default(),
        personality(DEFAULT_PERSONALITY).unwrap(),
        "d1",
        None,
        "what does entropy measure?",
    )
    .await
    .unwrap();

    assert!(out.content.contains("microstates"));
    assert!(!out.relevant_chunks.is_empty());
    assert!(out.relevant_chunks.len() <= 5);

    let messages = h.store.recent_messages(&out.session_id, 10).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert!(messages[1].metadata.is_some());
}

#[tokio::test]
async fn audio_ingest_propagates_timestamps_into_citations() {
    let h = harness().await;
    upload(
        &h,
        "d1",
        &[0u8; 32],
        FileType::Audio {
            mime: "audio/mpeg".to_string(),
        },
    )
    .await;

    // 300 words, one per second, so chunk time ranges span minutes.
    let words: Vec<WordSegment> = (0..300)
        .map(|i| WordSegment {
            text: "lecture".to_string(),
            start: i as f64,
            end: i as f64 + 0.8,
        })
        .collect();
    let text = vec!["lecture"; 300].join(" ");
    let extractor = SynapseExtractor::new(Arc::new(FixedTranscriber(Transcript {
        text,
        words,
        duration_secs: 300.0,
    })));

    process_document(
        &h.store,
        &h.blobs,
        &extractor,
        &HashEmbedder,
        &IngestOptions::default(),
        "d1",
    )
    .await
    .unwrap();

    let doc = h.store.get_document("d1").await.unwrap().unwrap();
    assert_eq!(doc.audio_duration, Some(300.0));

    let chunks = h.store.document_chunks("d1").await.unwrap();
    assert!(chunks.iter().all(|c| c.metadata.start_time.is_some()));

    let opts = GroundingOptions {
        include_timestamps: true,
        ..GroundingOptions::default()
    };
    let out = answer(
        &h.store,
        &HashEmbedder,
        &CannedModel("The professor covers this at [0:30]."),
        &opts,
        personality(DEFAULT_PERSONALITY).unwrap(),
        "d1",
        None,
        "when is it covered?",
    )
    .await
    .unwrap();

    assert_eq!(out.audio_references.len(), 1);
    assert_eq!(out.audio_references[0].timestamp, 30.0);
    assert!(!out.audio_references[0].chunk_id.is_empty());
}

#[tokio::test]
async fn failed_ingest_records_error_and_allows_status_reads() {
    let h = harness().await;
    upload(&h, "d1", b"not really a pdf", FileType::Pdf).await;

    let extractor = SynapseExtractor::new(Arc::new(FixedTranscriber(Transcript {
        text: String::new(),
        words: vec![],
        duration_secs: 0.0,
    })));
    let err = process_document(
        &h.store,
        &h.blobs,
        &extractor,
        &HashEmbedder,
        &IngestOptions::default(),
        "d1",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PipelineError::Extraction(_)));

    let doc = h.store.get_document("d1").await.unwrap().unwrap();
    assert_eq!(doc.status, DocumentStatus::Failed);
    assert!(doc.error.is_some());
    assert!(h.store.document_chunks("d1").await.unwrap().is_empty());
}

#[tokio::test]
async fn explicit_session_continues_the_conversation() {
    let h = harness().await;
    let text = study_text();
    upload(&h, "d1", text.as_bytes(), FileType::PlainText).await;

    let extractor = SynapseExtractor::new(Arc::new(FixedTranscriber(Transcript {
        text: String::new(),
        words: vec![],
        duration_secs: 0.0,
    })));
    process_document(
        &h.store,
        &h.blobs,
        &extractor,
        &HashEmbedder,
        &IngestOptions::default(),
        "d1",
    )
    .await
    .unwrap();

    h.store
        .create_session(&ChatSession {
            id: "s-explicit".to_string(),
            document_id: "d1".to_string(),
            created_at: 5,
        })
        .await
        .unwrap();

    let out = answer(
        &h.store,
        &HashEmbedder,
        &CannedModel("ok"),
        &GroundingOptions::default(),
        personality(DEFAULT_PERSONALITY).unwrap(),
        "d1",
        Some("s-explicit"),
        "first question?",
    )
    .await
    .unwrap();
    assert_eq!(out.session_id, "s-explicit");

    let err = answer(
        &h.store,
        &HashEmbedder,
        &CannedModel("ok"),
        &GroundingOptions::default(),
        personality(DEFAULT_PERSONALITY).unwrap(),
        "d1",
        Some("missing"),
        "second question?",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PipelineError::SessionNotFound(_)));
}
