//! SQLite-backed [`DocumentStore`].
//!
//! Documents, chunks, sessions, and messages live in the four tables
//! created by [`crate::migrate`]. Embeddings are stored as
//! little-endian `f32` BLOBs; vector search decodes the document's
//! chunk vectors and ranks them by cosine similarity in Rust, which is
//! plenty for per-document retrieval at study-material scale.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use synapse_core::error::StoreError;
use synapse_core::models::{
    ChatMessage, ChatSession, ChunkMetadata, ContentChunk, Document, DocumentStatus,
    ExtractionMetadata, FileType, MessageRole, ScoredChunk,
};
use synapse_core::store::DocumentStore;
use synapse_core::vector::{bytes_to_vector, cosine_similarity, vector_to_bytes};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &SqliteRow) -> Result<Document, StoreError> {
    let file_type_json: String = row.try_get("file_type_json").map_err(StoreError::backend)?;
    let file_type: FileType =
        serde_json::from_str(&file_type_json).map_err(StoreError::backend)?;

    let status_text: String = row.try_get("status").map_err(StoreError::backend)?;
    let status = DocumentStatus::parse(&status_text)
        .ok_or_else(|| StoreError::backend(format!("unknown document status: {status_text}")))?;

    let metadata_json: Option<String> =
        row.try_get("metadata_json").map_err(StoreError::backend)?;
    let metadata: Option<ExtractionMetadata> = metadata_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(StoreError::backend)?;

    let size_bytes: i64 = row.try_get("size_bytes").map_err(StoreError::backend)?;
    let progress: i64 = row
        .try_get("processing_progress")
        .map_err(StoreError::backend)?;

    Ok(Document {
        id: row.try_get("id").map_err(StoreError::backend)?,
        title: row.try_get("title").map_err(StoreError::backend)?,
        file_type,
        size_bytes: size_bytes.max(0) as u64,
        blob_ref: row.try_get("blob_ref").map_err(StoreError::backend)?,
        status,
        processing_progress: progress.clamp(0, 100) as u8,
        content: row.try_get("content").map_err(StoreError::backend)?,
        metadata,
        audio_duration: row.try_get("audio_duration").map_err(StoreError::backend)?,
        error: row.try_get("error").map_err(StoreError::backend)?,
        created_at: row.try_get("created_at").map_err(StoreError::backend)?,
        updated_at: row.try_get("updated_at").map_err(StoreError::backend)?,
    })
}

fn row_to_chunk(row: &SqliteRow) -> Result<ContentChunk, StoreError> {
    let metadata_json: String = row.try_get("metadata_json").map_err(StoreError::backend)?;
    let metadata: ChunkMetadata =
        serde_json::from_str(&metadata_json).map_err(StoreError::backend)?;
    let embedding: Vec<u8> = row.try_get("embedding").map_err(StoreError::backend)?;
    let index: i64 = row.try_get("chunk_index").map_err(StoreError::backend)?;

    Ok(ContentChunk {
        id: row.try_get("id").map_err(StoreError::backend)?,
        document_id: row.try_get("document_id").map_err(StoreError::backend)?,
        index: index.max(0) as usize,
        content: row.try_get("content").map_err(StoreError::backend)?,
        embedding: bytes_to_vector(&embedding),
        metadata,
    })
}

fn row_to_message(row: &SqliteRow) -> Result<ChatMessage, StoreError> {
    let role_text: String = row.try_get("role").map_err(StoreError::backend)?;
    let role = MessageRole::parse(&role_text)
        .ok_or_else(|| StoreError::backend(format!("unknown message role: {role_text}")))?;
    let metadata_json: Option<String> =
        row.try_get("metadata_json").map_err(StoreError::backend)?;
    let metadata = metadata_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(StoreError::backend)?;

    Ok(ChatMessage {
        id: row.try_get("id").map_err(StoreError::backend)?,
        session_id: row.try_get("session_id").map_err(StoreError::backend)?,
        role,
        content: row.try_get("content").map_err(StoreError::backend)?,
        metadata,
        created_at: row.try_get("created_at").map_err(StoreError::backend)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_document(&self, document: &Document) -> Result<(), StoreError> {
        let file_type_json =
            serde_json::to_string(&document.file_type).map_err(StoreError::backend)?;
        let metadata_json = document
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StoreError::backend)?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, title, file_type_json, size_bytes, blob_ref, status,
                processing_progress, content, metadata_json, audio_duration,
                error, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.title)
        .bind(file_type_json)
        .bind(document.size_bytes as i64)
        .bind(&document.blob_ref)
        .bind(document.status.as_str())
        .bind(document.processing_progress as i64)
        .bind(&document.content)
        .bind(metadata_json)
        .bind(document.audio_duration)
        .bind(&document.error)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query("SELECT * FROM documents ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        rows.iter().map(row_to_document).collect()
    }

    async fn begin_processing(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET status = 'processing', processing_progress = 0, updated_at = ?
            WHERE id = ? AND status IN ('uploading', 'uploaded')
            "#,
        )
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_progress(&self, id: &str, progress: u8) -> Result<(), StoreError> {
        sqlx::query("UPDATE documents SET processing_progress = ?, updated_at = ? WHERE id = ?")
            .bind(progress.min(100) as i64)
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn set_content(
        &self,
        id: &str,
        content: &str,
        metadata: &ExtractionMetadata,
        audio_duration: Option<f64>,
    ) -> Result<(), StoreError> {
        let metadata_json = serde_json::to_string(metadata).map_err(StoreError::backend)?;
        sqlx::query(
            r#"
            UPDATE documents
            SET content = ?, metadata_json = ?, audio_duration = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(content)
        .bind(metadata_json)
        .bind(audio_duration)
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn mark_completed(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE documents
            SET status = 'completed', processing_progress = 100, error = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE documents SET status = 'failed', error = ?, updated_at = ? WHERE id = ?",
        )
        .bind(error)
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn insert_chunk(&self, chunk: &ContentChunk) -> Result<(), StoreError> {
        let metadata_json =
            serde_json::to_string(&chunk.metadata).map_err(StoreError::backend)?;
        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, chunk_index, content, embedding, metadata_json)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.index as i64)
        .bind(&chunk.content)
        .bind(vector_to_bytes(&chunk.embedding))
        .bind(metadata_json)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<ContentChunk>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM chunks WHERE document_id = ? ORDER BY chunk_index ASC")
                .bind(document_id)
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn vector_search(
        &self,
        document_id: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let chunks = self.document_chunks(document_id).await?;
        let mut scored: Vec<ScoredChunk> = chunks
            .into_iter()
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(&chunk.embedding, query) as f64,
                chunk,
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO chat_sessions (id, document_id, created_at) VALUES (?, ?, ?)")
            .bind(&session.id)
            .bind(&session.document_id)
            .bind(session.created_at)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, StoreError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        row.map(|r| {
            Ok(ChatSession {
                id: r.try_get("id").map_err(StoreError::backend)?,
                document_id: r.try_get("document_id").map_err(StoreError::backend)?,
                created_at: r.try_get("created_at").map_err(StoreError::backend)?,
            })
        })
        .transpose()
    }

    async fn latest_session_for_document(
        &self,
        document_id: &str,
    ) -> Result<Option<ChatSession>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM chat_sessions
            WHERE document_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        row.map(|r| {
            Ok(ChatSession {
                id: r.try_get("id").map_err(StoreError::backend)?,
                document_id: r.try_get("document_id").map_err(StoreError::backend)?,
                created_at: r.try_get("created_at").map_err(StoreError::backend)?,
            })
        })
        .transpose()
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let metadata_json = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StoreError::backend)?;
        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, session_id, role, content, metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(metadata_json)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        // Insertion order within a second matters; rowid breaks ties.
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT *, rowid AS seq FROM chat_messages
                WHERE session_id = ?
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?
            )
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        rows.iter().map(row_to_message).collect()
    }
}
