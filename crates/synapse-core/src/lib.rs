//! Core pipeline for Synapse: document chunking, embedding-backed
//! retrieval, and retrieval-grounded question answering.
//!
//! This crate is pure logic plus trait seams. It defines the data
//! model, the sentence-aware chunker, cosine retrieval, prompt and
//! citation handling, and the two orchestrators
//! ([`ingest::process_document`] and [`ground::answer`]) — all written
//! against the [`services`] and [`store`] traits. Network providers,
//! SQLite persistence, and the CLI live in the `synapse` application
//! crate.

pub mod chunk;
pub mod cite;
pub mod error;
pub mod ground;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod services;
pub mod store;
pub mod timestamp;
pub mod vector;

pub use error::{PipelineError, StoreError};
pub use models::{
    AudioReference, ChatMessage, ChatSession, ChunkMetadata, ContentChunk, Document,
    DocumentStatus, ExtractionMetadata, FileType, MessageRole, ScoredChunk, WordSegment,
};
