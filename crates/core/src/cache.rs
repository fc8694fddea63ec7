//! Artifact cache.
//!
//! Cache membership is "a regular file exists at the key's path"; there is
//! no index. Artifacts are never evicted, so the cache root grows without
//! bound and must be pruned externally.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cache_key::CacheKey;
use crate::error::ThumbError;

/// A stored artifact read back for serving.
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    pub bytes: Vec<u8>,
    /// Last modification time, when the backing store knows it.
    pub modified: Option<DateTime<Utc>>,
}

/// Storage for produced thumbnails, addressed by [`CacheKey`].
#[async_trait]
pub trait ArtifactCache: Send + Sync {
    /// `true` iff a complete artifact is stored under `key`.
    async fn exists(&self, key: &CacheKey) -> bool;

    /// Create whatever containers `key` needs. Idempotent.
    async fn ensure_dir(&self, key: &CacheKey) -> Result<(), ThumbError>;

    /// Store `bytes` under `key`. Readers never observe a partial write.
    async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), ThumbError>;

    async fn read(&self, key: &CacheKey) -> Result<CachedArtifact, ThumbError>;
}

// ---------------------------------------------------------------------------
// Filesystem implementation
// ---------------------------------------------------------------------------

/// [`ArtifactCache`] on a local directory tree.
#[derive(Debug, Clone)]
pub struct FsArtifactCache {
    root: PathBuf,
}

impl FsArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of the artifact for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Whether the root exists as a directory that accepts new files.
    pub async fn is_writable(&self) -> bool {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }
}

fn storage_error(path: &Path, source: std::io::Error) -> ThumbError {
    ThumbError::StorageFailed {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

/// Sibling temp path in the same directory, so the final rename never
/// crosses a filesystem boundary.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()))
}

#[async_trait]
impl ArtifactCache for FsArtifactCache {
    async fn exists(&self, key: &CacheKey) -> bool {
        tokio::fs::metadata(self.path_for(key))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn ensure_dir(&self, key: &CacheKey) -> Result<(), ThumbError> {
        let dir = self.root.join(key.date_dir());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_error(&dir, e))
    }

    async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), ThumbError> {
        let path = self.path_for(key);
        let tmp = temp_path_for(&path);

        let result = async {
            tokio::fs::write(&tmp, bytes)
                .await
                .map_err(|e| storage_error(&tmp, e))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|e| storage_error(&path, e))
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }

    async fn read(&self, key: &CacheKey) -> Result<CachedArtifact, ThumbError> {
        let path = self.path_for(key);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| storage_error(&path, e))?;
        let modified = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);
        Ok(CachedArtifact { bytes, modified })
    }
}
