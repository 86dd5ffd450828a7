//! Local filesystem blob store with staged writes.
//!
//! New binaries are first written under `<root>/.staging/` and only renamed
//! into `<root>/<brand>/<file>` once their catalog records are committed.
//! `rename` replaces an existing target atomically, so readers never observe
//! a missing file during an overwrite.

use std::io;
use std::path::{Component, Path, PathBuf};

use partsdb_core::STAGING_DIR;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unsafe storage path '{0}'")]
    UnsafePath(String),
    #[error("storage I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A binary written to the staging area, waiting to be promoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBlob {
    /// Absolute path of the staging file.
    pub staged_path: PathBuf,
    /// Final location relative to the store root, e.g. `"bosch/ab1234.png"`.
    pub relative_path: String,
    /// Lowercase hex SHA-256 of the content.
    pub content_sha256: String,
    pub byte_size: u64,
}

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a store-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsafePath`] for absolute paths or paths with
    /// `..`, `.` or prefix components.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(relative);
        let is_safe = !relative.is_empty()
            && candidate
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_safe {
            return Err(StorageError::UnsafePath(relative.to_string()));
        }
        Ok(self.root.join(candidate))
    }

    /// Write `bytes` to a fresh staging file destined for `relative_path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the path is unsafe or the write fails.
    pub async fn stage(&self, relative_path: &str, bytes: &[u8]) -> Result<StagedBlob, StorageError> {
        // Validate the destination now so promotion cannot fail on it later.
        self.resolve(relative_path)?;

        let staging_dir = self.root.join(STAGING_DIR);
        tokio::fs::create_dir_all(&staging_dir)
            .await
            .map_err(|e| StorageError::io(&staging_dir, e))?;

        let staged_path = staging_dir.join(Uuid::new_v4().to_string());
        tokio::fs::write(&staged_path, bytes)
            .await
            .map_err(|e| StorageError::io(&staged_path, e))?;

        Ok(StagedBlob {
            staged_path,
            relative_path: relative_path.to_string(),
            content_sha256: content_sha256(bytes),
            byte_size: bytes.len() as u64,
        })
    }

    /// Move a staged blob to its final location, replacing any file there.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the target directory cannot be created or
    /// the rename fails.
    pub async fn promote(&self, staged: &StagedBlob) -> Result<(), StorageError> {
        let target = self.resolve(&staged.relative_path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }
        tokio::fs::rename(&staged.staged_path, &target)
            .await
            .map_err(|e| StorageError::io(&target, e))
    }

    /// Remove a staged blob. Failures are logged, never returned.
    pub async fn discard(&self, staged: &StagedBlob) {
        if let Err(error) = tokio::fs::remove_file(&staged.staged_path).await {
            if error.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %staged.staged_path.display(),
                    error = %error,
                    "failed to discard staged blob"
                );
            }
        }
    }

    /// Delete a stored blob. Returns `false` when there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the path is unsafe or removal fails for a
    /// reason other than the file being absent.
    pub async fn remove(&self, relative: &str) -> Result<bool, StorageError> {
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// # Errors
    ///
    /// Returns [`StorageError`] if the path is unsafe or cannot be inspected.
    pub async fn exists(&self, relative: &str) -> Result<bool, StorageError> {
        let path = self.resolve(relative)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))
    }

    /// # Errors
    ///
    /// Returns [`StorageError`] if the path is unsafe or cannot be read.
    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(relative)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn content_sha256(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
