//! Core data models for the Synapse ingestion and grounding pipeline.
//!
//! These types represent the documents, chunks, transcript segments,
//! and chat records that flow from upload through extraction, chunking,
//! embedding, and retrieval-grounded question answering.

use serde::{Deserialize, Serialize};

/// Source file format of an uploaded document.
///
/// Extraction dispatches on this variant rather than on scattered MIME
/// string comparisons. `Audio` retains the concrete MIME type
/// (`audio/mpeg`, `audio/wav`, …) because the transcription service
/// needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileType {
    Pdf,
    Audio { mime: String },
    Markdown,
    PlainText,
}

impl FileType {
    /// Map a declared MIME type to a supported format.
    ///
    /// Returns `None` for anything outside the supported set; the
    /// caller turns that into an `UnsupportedFormat` error naming the
    /// offending type.
    pub fn from_mime(mime: &str) -> Option<FileType> {
        match mime {
            "application/pdf" => Some(FileType::Pdf),
            "text/markdown" => Some(FileType::Markdown),
            "text/plain" => Some(FileType::PlainText),
            m if m.starts_with("audio/") => Some(FileType::Audio {
                mime: m.to_string(),
            }),
            _ => None,
        }
    }

    /// The MIME type this variant was declared with.
    pub fn mime(&self) -> &str {
        match self {
            FileType::Pdf => "application/pdf",
            FileType::Audio { mime } => mime,
            FileType::Markdown => "text/markdown",
            FileType::PlainText => "text/plain",
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, FileType::Audio { .. })
    }
}

/// Lifecycle status of a document.
///
/// Moves forward only: `Uploading → Uploaded → Processing` and then to
/// one of the terminal states `Completed` or `Failed`. The store's
/// compare-and-swap transition enforces that a second concurrent
/// ingestion run cannot re-enter `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploading,
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<DocumentStatus> {
        match s {
            "uploading" => Some(DocumentStatus::Uploading),
            "uploaded" => Some(DocumentStatus::Uploaded),
            "processing" => Some(DocumentStatus::Processing),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }
}

/// An uploaded document and its ingestion state.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub file_type: FileType,
    pub size_bytes: u64,
    /// Reference into the blob store for the raw uploaded bytes.
    pub blob_ref: String,
    pub status: DocumentStatus,
    /// Advisory 0–100 percentage for UI polling.
    pub processing_progress: u8,
    /// Full extracted text, present once extraction has run.
    pub content: Option<String>,
    /// Extraction metadata (page count or word timestamps).
    pub metadata: Option<ExtractionMetadata>,
    /// Source duration in seconds, audio documents only.
    pub audio_duration: Option<f64>,
    /// Failure message from the last ingestion run, if any.
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Format-specific metadata captured at extraction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionMetadata {
    Pdf { page_count: usize },
    Audio {
        duration_secs: f64,
        words: Vec<WordSegment>,
    },
    Text,
}

/// A word-level transcript segment from the transcription service.
///
/// Ephemeral: consumed by the chunker to compute chunk time ranges and
/// persisted only inside the document's extraction metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSegment {
    pub text: String,
    /// Start of the word, seconds from the beginning of the audio.
    pub start: f64,
    /// End of the word, seconds.
    pub end: f64,
}

/// Positional metadata for one content chunk.
///
/// `start_offset`/`end_offset` are **pre-trim** character offsets into
/// the document's extracted text: the recorded `content` is trimmed
/// but the bounds are the raw slice bounds at emission time. This is a
/// deliberate compatibility quirk, not a bug to fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub start_offset: usize,
    pub end_offset: usize,
    /// Set only for audio documents whose transcript segments overlap
    /// this chunk's character range. `start_time <= end_time` holds
    /// whenever both are present, and they are always set together.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<usize>,
}

/// An embedded slice of a document's extracted text — the unit of
/// similarity search and retrieval. Immutable once created.
#[derive(Debug, Clone)]
pub struct ContentChunk {
    pub id: String,
    pub document_id: String,
    /// 0-based, contiguous, strictly increasing in reading order.
    pub index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A chunk returned from vector search, with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: ContentChunk,
    /// Cosine similarity against the query embedding, higher = better.
    pub score: f64,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<MessageRole> {
        match s {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// One message in a chat session.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Assistant messages carry `{chunk_ids, audio_references}`.
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
}

/// A chat session bound to one document.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: String,
    pub document_id: String,
    pub created_at: i64,
}

/// A citation linking a generated response's timestamp marker back to
/// a source chunk and time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioReference {
    /// The cited position, seconds into the audio.
    pub timestamp: f64,
    /// Length of the cited window, seconds (defaults to 30 when the
    /// source chunk has no end time).
    pub duration: f64,
    /// Surrounding response text, for display next to the citation.
    pub text: String,
    pub chunk_id: String,
}
