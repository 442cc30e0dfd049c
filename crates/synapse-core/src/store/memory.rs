//! In-memory [`DocumentStore`] backed by `RwLock`ed maps.
//!
//! Used by the pipeline tests and suitable for embedding Synapse in
//! tools that do not want a database on disk. Not durable.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    ChatMessage, ChatSession, ContentChunk, Document, DocumentStatus, ExtractionMetadata,
    ScoredChunk,
};
use crate::store::DocumentStore;
use crate::vector::cosine_similarity;

#[derive(Default)]
struct Inner {
    documents: HashMap<String, Document>,
    chunks: Vec<ContentChunk>,
    sessions: HashMap<String, ChatSession>,
    messages: Vec<ChatMessage>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::backend("lock poisoned"))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_document(&self, document: &Document) -> Result<(), StoreError> {
        self.write()?
            .documents
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.read()?.documents.get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        let mut documents: Vec<Document> = self.read()?.documents.values().cloned().collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn begin_processing(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        match inner.documents.get_mut(id) {
            Some(doc)
                if matches!(
                    doc.status,
                    DocumentStatus::Uploading | DocumentStatus::Uploaded
                ) =>
            {
                doc.status = DocumentStatus::Processing;
                doc.processing_progress = 0;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_progress(&self, id: &str, progress: u8) -> Result<(), StoreError> {
        if let Some(doc) = self.write()?.documents.get_mut(id) {
            doc.processing_progress = progress.min(100);
        }
        Ok(())
    }

    async fn set_content(
        &self,
        id: &str,
        content: &str,
        metadata: &ExtractionMetadata,
        audio_duration: Option<f64>,
    ) -> Result<(), StoreError> {
        if let Some(doc) = self.write()?.documents.get_mut(id) {
            doc.content = Some(content.to_string());
            doc.metadata = Some(metadata.clone());
            doc.audio_duration = audio_duration;
        }
        Ok(())
    }

    async fn mark_completed(&self, id: &str) -> Result<(), StoreError> {
        if let Some(doc) = self.write()?.documents.get_mut(id) {
            doc.status = DocumentStatus::Completed;
            doc.processing_progress = 100;
            doc.error = None;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), StoreError> {
        if let Some(doc) = self.write()?.documents.get_mut(id) {
            doc.status = DocumentStatus::Failed;
            doc.error = Some(error.to_string());
        }
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &ContentChunk) -> Result<(), StoreError> {
        self.write()?.chunks.push(chunk.clone());
        Ok(())
    }

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<ContentChunk>, StoreError> {
        let mut chunks: Vec<ContentChunk> = self
            .read()?
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.index);
        Ok(chunks)
    }

    async fn vector_search(
        &self,
        document_id: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let mut scored: Vec<ScoredChunk> = self
            .read()?
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .map(|c| ScoredChunk {
                score: cosine_similarity(&c.embedding, query) as f64,
                chunk: c.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError> {
        self.write()?
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, StoreError> {
        Ok(self.read()?.sessions.get(id).cloned())
    }

    async fn latest_session_for_document(
        &self,
        document_id: &str,
    ) -> Result<Option<ChatSession>, StoreError> {
        Ok(self
            .read()?
            .sessions
            .values()
            .filter(|s| s.document_id == document_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        self.write()?.messages.push(message.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.read()?;
        let matching: Vec<&ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.into_iter().skip(skip).cloned().collect())
    }
}
