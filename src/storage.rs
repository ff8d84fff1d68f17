//! Storage for uploaded manuscripts and payment proofs.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::blob::{BlobKind, BlobRef};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` and return a reference relative to the media root.
    async fn put(&self, kind: BlobKind, original_name: &str, bytes: &[u8]) -> Result<BlobRef>;
}

/// Blob store writing under a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Keep the final path component and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, kind: BlobKind, original_name: &str, bytes: &[u8]) -> Result<BlobRef> {
        let name = format!("{}-{}", Uuid::new_v4().simple(), sanitize_file_name(original_name));
        let relative = format!("{}/{}", kind.prefix(), name);

        let dir = self.root.join(kind.prefix());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;

        let path = dir.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;

        info!(path = %relative, size = bytes.len(), "Stored upload");
        Ok(BlobRef::new(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("paper.pdf"), "paper.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my paper.pdf"), "my_paper.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[tokio::test]
    async fn test_put_writes_under_kind_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let blob = store
            .put(BlobKind::PaymentProof, "receipt.png", b"png-bytes")
            .await
            .unwrap();

        assert!(blob.url_or_path().starts_with("payment_proofs/"));
        assert!(blob.url_or_path().ends_with("-receipt.png"));
        let written = std::fs::read(dir.path().join(blob.url_or_path())).unwrap();
        assert_eq!(written, b"png-bytes");
    }

    #[tokio::test]
    async fn test_same_name_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let first = store.put(BlobKind::Manuscript, "a.pdf", b"1").await.unwrap();
        let second = store.put(BlobKind::Manuscript, "a.pdf", b"2").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_write_failure_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("not-a-dir");
        std::fs::write(&blocked, b"file").unwrap();
        let store = LocalBlobStore::new(&blocked);

        let err = store.put(BlobKind::Manuscript, "a.pdf", b"1").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
