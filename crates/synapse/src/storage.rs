//! Content-addressed local blob storage for uploaded files.
//!
//! Blobs are named by the SHA-256 of their bytes and laid out as
//! `<blob_dir>/<first two hex chars>/<full hex digest>`. Re-uploading
//! identical bytes is a no-op that returns the same reference.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use synapse_core::error::PipelineError;
use synapse_core::services::BlobStore;

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, digest: &str) -> PathBuf {
        self.root.join(&digest[..2]).join(digest)
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, bytes: &[u8], _mime: &str) -> Result<String, PipelineError> {
        let digest = digest_hex(bytes);
        let path = self.path_for(&digest);
        if !path.exists() {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PipelineError::Storage(e.to_string()))?;
            }
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|e| PipelineError::Storage(e.to_string()))?;
        }
        Ok(format!("sha256:{digest}"))
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, PipelineError> {
        let digest = blob_ref
            .strip_prefix("sha256:")
            .filter(|d| d.len() == 64 && d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| PipelineError::Storage(format!("invalid blob reference: {blob_ref}")))?;
        tokio::fs::read(self.path_for(digest))
            .await
            .map_err(|e| PipelineError::Storage(format!("blob {blob_ref} unreadable: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_fetch_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf());
        let blob_ref = store.store(b"lecture bytes", "text/plain").await.unwrap();
        assert!(blob_ref.starts_with("sha256:"));
        assert_eq!(store.fetch(&blob_ref).await.unwrap(), b"lecture bytes");
    }

    #[tokio::test]
    async fn identical_bytes_share_a_reference() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf());
        let a = store.store(b"same", "text/plain").await.unwrap();
        let b = store.store(b"same", "text/plain").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn unknown_and_malformed_references_fail() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().to_path_buf());
        let missing = format!("sha256:{}", "0".repeat(64));
        assert!(matches!(
            store.fetch(&missing).await,
            Err(PipelineError::Storage(_))
        ));
        assert!(matches!(
            store.fetch("not-a-ref").await,
            Err(PipelineError::Storage(_))
        ));
    }
}
