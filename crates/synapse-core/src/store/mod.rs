//! Persistence trait for documents, chunks, and chat history.
//!
//! The pipeline is written against [`DocumentStore`]; the app crate
//! provides a SQLite implementation and this module ships an in-memory
//! one for tests and embedding into other tooling.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    ChatMessage, ChatSession, ContentChunk, Document, ExtractionMetadata, ScoredChunk,
};

/// Storage backend for the ingestion and grounding pipelines.
///
/// Mutating document methods address rows by id and return `Ok` as a
/// no-op when the id is unknown; callers fetch the document first.
/// [`begin_processing`](DocumentStore::begin_processing) is the
/// exception and reports whether the transition happened.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, document: &Document) -> Result<(), StoreError>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// All documents, newest first.
    async fn list_documents(&self) -> Result<Vec<Document>, StoreError>;

    /// Compare-and-swap into `processing`.
    ///
    /// Returns `true` only if the document existed in `uploading` or
    /// `uploaded` and was moved to `processing` (progress reset to 0).
    /// Exactly one of several concurrent callers observes `true`.
    async fn begin_processing(&self, id: &str) -> Result<bool, StoreError>;

    async fn set_progress(&self, id: &str, progress: u8) -> Result<(), StoreError>;

    /// Record the extracted text and format metadata.
    async fn set_content(
        &self,
        id: &str,
        content: &str,
        metadata: &ExtractionMetadata,
        audio_duration: Option<f64>,
    ) -> Result<(), StoreError>;

    /// Terminal success: `completed`, progress 100, error cleared.
    async fn mark_completed(&self, id: &str) -> Result<(), StoreError>;

    /// Terminal failure: `failed`, with the error message recorded.
    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), StoreError>;

    async fn insert_chunk(&self, chunk: &ContentChunk) -> Result<(), StoreError>;

    /// Chunks of one document in index order.
    async fn document_chunks(&self, document_id: &str) -> Result<Vec<ContentChunk>, StoreError>;

    /// Top-`limit` chunks of one document by cosine similarity to
    /// `query`, highest first.
    async fn vector_search(
        &self,
        document_id: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError>;

    async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError>;

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, StoreError>;

    /// Most recently created session for a document, if any.
    async fn latest_session_for_document(
        &self,
        document_id: &str,
    ) -> Result<Option<ChatSession>, StoreError>;

    async fn append_message(&self, message: &ChatMessage) -> Result<(), StoreError>;

    /// Last `limit` messages of a session, oldest first.
    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError>;
}
