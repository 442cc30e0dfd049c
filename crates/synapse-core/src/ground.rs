//! Retrieval-grounded question answering over one document.
//!
//! [`answer`] resolves a chat session, embeds the question, retrieves
//! the top-K chunks of the document by cosine similarity, assembles
//! the personality-flavored prompts, calls the completion model, and
//! persists both sides of the exchange. For audio documents with
//! timestamps requested, inline `[M:SS]` markers in the response are
//! resolved to [`AudioReference`]s against the retrieved chunks.

use chrono::Utc;
use uuid::Uuid;

use crate::cite::extract_audio_references;
use crate::error::PipelineError;
use crate::models::{
    AudioReference, ChatMessage, ChatSession, ChunkMetadata, ContentChunk, MessageRole,
    ScoredChunk,
};
use crate::prompt::{build_context, build_user_prompt, system_prompt, Personality};
use crate::services::{CompletionModel, Embedder};
use crate::store::DocumentStore;

/// Number of chunks retrieved per question.
pub const TOP_K: usize = 5;

/// Number of prior messages included as conversational context.
pub const HISTORY_LIMIT: usize = 10;

/// Characters of chunk content surfaced in [`ChunkPreview`].
const PREVIEW_CHARS: usize = 200;

/// Tunables for one grounded answer.
#[derive(Debug, Clone)]
pub struct GroundingOptions {
    pub top_k: usize,
    pub history_limit: usize,
    pub max_tokens: Option<u32>,
    /// Resolve inline timestamp markers into audio references and
    /// label audio chunks with their time ranges.
    pub include_timestamps: bool,
}

impl Default for GroundingOptions {
    fn default() -> Self {
        Self {
            top_k: TOP_K,
            history_limit: HISTORY_LIMIT,
            max_tokens: None,
            include_timestamps: false,
        }
    }
}

/// A retrieved chunk as surfaced to the caller: truncated content plus
/// its score and positional metadata.
#[derive(Debug, Clone)]
pub struct ChunkPreview {
    pub chunk_id: String,
    pub index: usize,
    /// First 200 characters of the chunk content.
    pub preview: String,
    pub score: f64,
    pub metadata: ChunkMetadata,
}

/// The outcome of one grounded question.
#[derive(Debug, Clone)]
pub struct GroundedAnswer {
    pub content: String,
    pub session_id: String,
    pub audio_references: Vec<AudioReference>,
    pub relevant_chunks: Vec<ChunkPreview>,
}

/// Answer a question about a document, grounded in its chunks.
///
/// With `session_id = Some`, the session must exist and belong to the
/// conversation being continued; with `None`, the document's most
/// recent session is reused, or a fresh one created. Completion
/// failures propagate without persisting an assistant message — the
/// user's question remains in the session for a retry.
#[allow(clippy::too_many_arguments)]
pub async fn answer(
    store: &dyn DocumentStore,
    embedder: &dyn Embedder,
    model: &dyn CompletionModel,
    options: &GroundingOptions,
    personality: &Personality,
    document_id: &str,
    session_id: Option<&str>,
    question: &str,
) -> Result<GroundedAnswer, PipelineError> {
    store
        .get_document(document_id)
        .await?
        .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;

    let session = resolve_session(store, document_id, session_id).await?;

    let user_message = ChatMessage {
        id: Uuid::new_v4().to_string(),
        session_id: session.id.clone(),
        role: MessageRole::User,
        content: question.to_string(),
        metadata: None,
        created_at: Utc::now().timestamp(),
    };
    store.append_message(&user_message).await?;

    let query = embedder.embed_one(question).await?;
    let retrieved = store
        .vector_search(document_id, &query, options.top_k)
        .await?;
    tracing::debug!(
        document_id,
        session_id = %session.id,
        retrieved = retrieved.len(),
        "retrieval done"
    );

    let context = build_context(&retrieved, options.include_timestamps);
    let history = conversation_history(store, &session.id, &user_message.id, options).await?;

    let timestamps_relevant = options.include_timestamps
        && retrieved
            .iter()
            .any(|s| s.chunk.metadata.start_time.is_some());
    let system = system_prompt(personality, timestamps_relevant);
    let user = build_user_prompt(&history, &context, question);

    let content = model
        .complete(&system, &user, personality.temperature, options.max_tokens)
        .await?;

    let audio_references = if options.include_timestamps {
        let candidates: Vec<ContentChunk> =
            retrieved.iter().map(|s| s.chunk.clone()).collect();
        extract_audio_references(&content, &candidates)
    } else {
        Vec::new()
    };

    let chunk_ids: Vec<&str> = retrieved.iter().map(|s| s.chunk.id.as_str()).collect();
    let metadata = serde_json::json!({
        "chunk_ids": chunk_ids,
        "audio_references": audio_references,
    });
    let assistant_message = ChatMessage {
        id: Uuid::new_v4().to_string(),
        session_id: session.id.clone(),
        role: MessageRole::Assistant,
        content: content.clone(),
        metadata: Some(metadata),
        created_at: Utc::now().timestamp(),
    };
    store.append_message(&assistant_message).await?;

    Ok(GroundedAnswer {
        content,
        session_id: session.id,
        audio_references,
        relevant_chunks: retrieved.iter().map(preview).collect(),
    })
}

async fn resolve_session(
    store: &dyn DocumentStore,
    document_id: &str,
    session_id: Option<&str>,
) -> Result<ChatSession, PipelineError> {
    if let Some(id) = session_id {
        return store
            .get_session(id)
            .await?
            .ok_or_else(|| PipelineError::SessionNotFound(id.to_string()));
    }
    if let Some(session) = store.latest_session_for_document(document_id).await? {
        return Ok(session);
    }
    let session = ChatSession {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        created_at: Utc::now().timestamp(),
    };
    store.create_session(&session).await?;
    Ok(session)
}

/// Prior messages of the session, excluding the question just
/// persisted (it is carried separately in the user prompt).
async fn conversation_history(
    store: &dyn DocumentStore,
    session_id: &str,
    current_message_id: &str,
    options: &GroundingOptions,
) -> Result<Vec<ChatMessage>, PipelineError> {
    let recent = store
        .recent_messages(session_id, options.history_limit + 1)
        .await?;
    let mut history: Vec<ChatMessage> = recent
        .into_iter()
        .filter(|m| m.id != current_message_id)
        .collect();
    let skip = history.len().saturating_sub(options.history_limit);
    history.drain(..skip);
    Ok(history)
}

fn preview(scored: &ScoredChunk) -> ChunkPreview {
    ChunkPreview {
        chunk_id: scored.chunk.id.clone(),
        index: scored.chunk.index,
        preview: scored.chunk.content.chars().take(PREVIEW_CHARS).collect(),
        score: scored.score,
        metadata: scored.chunk.metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentStatus, FileType};
    use crate::prompt::{personality, DEFAULT_PERSONALITY};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::RwLock;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fake"
        }

        fn dims(&self) -> usize {
            self.0.len()
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
    }

    /// Returns a canned response and records the prompts it saw.
    struct CannedModel {
        response: String,
        seen: RwLock<Vec<(String, String, f32)>>,
    }

    impl CannedModel {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                seen: RwLock::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for CannedModel {
        async fn complete(
            &self,
            system_prompt: &str,
            user_prompt: &str,
            temperature: f32,
            _max_tokens: Option<u32>,
        ) -> Result<String, PipelineError> {
            self.seen.write().unwrap().push((
                system_prompt.to_string(),
                user_prompt.to_string(),
                temperature,
            ));
            Ok(self.response.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl CompletionModel for FailingModel {
        async fn complete(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _temperature: f32,
            _max_tokens: Option<u32>,
        ) -> Result<String, PipelineError> {
            Err(PipelineError::Completion("rate limited".to_string()))
        }
    }

    async fn seed_document(store: &MemoryStore, id: &str, audio: bool) {
        store
            .insert_document(&Document {
                id: id.to_string(),
                title: "lecture".to_string(),
                file_type: if audio {
                    FileType::Audio {
                        mime: "audio/mpeg".to_string(),
                    }
                } else {
                    FileType::PlainText
                },
                size_bytes: 1,
                blob_ref: "b".to_string(),
                status: DocumentStatus::Completed,
                processing_progress: 100,
                content: Some("text".to_string()),
                metadata: None,
                audio_duration: None,
                error: None,
                created_at: 0,
                updated_at: 0,
            })
            .await
            .unwrap();
    }

    async fn seed_chunk(
        store: &MemoryStore,
        id: &str,
        doc_id: &str,
        index: usize,
        embedding: Vec<f32>,
        times: Option<(f64, f64)>,
        content: &str,
    ) {
        store
            .insert_chunk(&ContentChunk {
                id: id.to_string(),
                document_id: doc_id.to_string(),
                index,
                content: content.to_string(),
                embedding,
                metadata: ChunkMetadata {
                    start_offset: 0,
                    end_offset: content.len(),
                    start_time: times.map(|(s, _)| s),
                    end_time: times.map(|(_, e)| e),
                    page_number: None,
                },
            })
            .await
            .unwrap();
    }

    fn default_personality() -> &'static Personality {
        personality(DEFAULT_PERSONALITY).unwrap()
    }

    #[tokio::test]
    async fn answer_persists_both_messages_and_returns_previews() {
        let store = MemoryStore::new();
        seed_document(&store, "d1", false).await;
        seed_chunk(&store, "c1", "d1", 0, vec![1.0, 0.0], None, "entropy rises").await;
        seed_chunk(&store, "c2", "d1", 1, vec![0.0, 1.0], None, "enthalpy differs").await;

        let model = CannedModel::new("It rises. [Chunk 1]");
        let out = answer(
            &store,
            &FixedEmbedder(vec![1.0, 0.1]),
            &model,
            &GroundingOptions::default(),
            default_personality(),
            "d1",
            None,
            "what happens to entropy?",
        )
        .await
        .unwrap();

        assert_eq!(out.content, "It rises. [Chunk 1]");
        assert_eq!(out.relevant_chunks.len(), 2);
        assert_eq!(out.relevant_chunks[0].chunk_id, "c1");
        assert!(out.audio_references.is_empty());

        let messages = store.recent_messages(&out.session_id, 10).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        let meta = messages[1].metadata.as_ref().unwrap();
        assert_eq!(meta["chunk_ids"][0], "c1");

        // First exchange: no prior history in the prompt.
        let seen = model.seen.read().unwrap();
        assert!(!seen[0].1.contains("Previous conversation"));
        assert!(seen[0].1.contains("[Chunk 1]\nentropy rises"));
        assert!(seen[0].1.ends_with("Question: what happens to entropy?"));
        assert_eq!(seen[0].2, default_personality().temperature);
    }

    #[tokio::test]
    async fn second_question_reuses_latest_session_and_carries_history() {
        let store = MemoryStore::new();
        seed_document(&store, "d1", false).await;
        seed_chunk(&store, "c1", "d1", 0, vec![1.0], None, "fact").await;

        let model = CannedModel::new("answer one");
        let opts = GroundingOptions::default();
        let first = answer(
            &store,
            &FixedEmbedder(vec![1.0]),
            &model,
            &opts,
            default_personality(),
            "d1",
            None,
            "first?",
        )
        .await
        .unwrap();

        let second = answer(
            &store,
            &FixedEmbedder(vec![1.0]),
            &model,
            &opts,
            default_personality(),
            "d1",
            None,
            "second?",
        )
        .await
        .unwrap();

        assert_eq!(first.session_id, second.session_id);
        let seen = model.seen.read().unwrap();
        assert!(seen[1].1.contains("Previous conversation:"));
        assert!(seen[1].1.contains("user: first?"));
        assert!(seen[1].1.contains("assistant: answer one"));
    }

    #[tokio::test]
    async fn timestamps_produce_audio_references_and_marker_instructions() {
        let store = MemoryStore::new();
        seed_document(&store, "d1", true).await;
        seed_chunk(
            &store,
            "c1",
            "d1",
            0,
            vec![1.0],
            Some((100.0, 130.0)),
            "the key moment",
        )
        .await;

        let model = CannedModel::new("Covered at [2:05] in the lecture.");
        let opts = GroundingOptions {
            include_timestamps: true,
            ..GroundingOptions::default()
        };
        let out = answer(
            &store,
            &FixedEmbedder(vec![1.0]),
            &model,
            &opts,
            default_personality(),
            "d1",
            None,
            "when is the key moment?",
        )
        .await
        .unwrap();

        assert_eq!(out.audio_references.len(), 1);
        assert_eq!(out.audio_references[0].timestamp, 125.0);
        assert_eq!(out.audio_references[0].chunk_id, "c1");

        let messages = store.recent_messages(&out.session_id, 10).await.unwrap();
        let meta = messages[1].metadata.as_ref().unwrap();
        assert_eq!(meta["audio_references"][0]["timestamp"], 125.0);

        let seen = model.seen.read().unwrap();
        assert!(seen[0].0.contains("[M:SS]"));
        assert!(seen[0].1.contains("Audio 1:40 to 2:10"));
    }

    #[tokio::test]
    async fn explicit_unknown_session_is_an_error() {
        let store = MemoryStore::new();
        seed_document(&store, "d1", false).await;
        let err = answer(
            &store,
            &FixedEmbedder(vec![1.0]),
            &CannedModel::new("x"),
            &GroundingOptions::default(),
            default_personality(),
            "d1",
            Some("no-such-session"),
            "hello?",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn completion_failure_leaves_question_but_no_answer() {
        let store = MemoryStore::new();
        seed_document(&store, "d1", false).await;
        seed_chunk(&store, "c1", "d1", 0, vec![1.0], None, "fact").await;

        let err = answer(
            &store,
            &FixedEmbedder(vec![1.0]),
            &FailingModel,
            &GroundingOptions::default(),
            default_personality(),
            "d1",
            None,
            "doomed?",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Completion(_)));

        let session = store
            .latest_session_for_document("d1")
            .await
            .unwrap()
            .unwrap();
        let messages = store.recent_messages(&session.id, 10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let store = MemoryStore::new();
        let err = answer(
            &store,
            &FixedEmbedder(vec![1.0]),
            &CannedModel::new("x"),
            &GroundingOptions::default(),
            default_personality(),
            "ghost",
            None,
            "anyone?",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn preview_is_truncated_to_two_hundred_chars() {
        let store = MemoryStore::new();
        seed_document(&store, "d1", false).await;
        let long = "x".repeat(500);
        seed_chunk(&store, "c1", "d1", 0, vec![1.0], None, &long).await;

        let out = answer(
            &store,
            &FixedEmbedder(vec![1.0]),
            &CannedModel::new("ok"),
            &GroundingOptions::default(),
            default_personality(),
            "d1",
            None,
            "q?",
        )
        .await
        .unwrap();
        assert_eq!(out.relevant_chunks[0].preview.chars().count(), 200);
    }
}
