//! Synapse application crate: configuration, SQLite persistence,
//! blob storage, network providers (OpenAI, Ollama, Deepgram), and
//! the CLI commands that drive the `synapse-core` pipeline.

pub mod ask;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod get;
pub mod migrate;
pub mod sqlite_store;
pub mod status;
pub mod storage;
pub mod transcription;
pub mod upload;
