//! Blob storage for uploaded drawings (the "drawings" bucket).
//!
//! Keys look like `{user_id}/{drawing_id}.{ext}`, so each owner's drawings share a
//! directory. Metadata (owner, content type, retention deadline) lives in the
//! `drawings` table; this module only moves bytes.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::Error;
use crate::types::{DrawingId, UserId};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("blob {0} not found")]
    NotFound(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => Error::NotFound {
                resource: "Drawing".to_string(),
                id: key,
            },
            other => Error::Other(anyhow::Error::from(other)),
        }
    }
}

/// Trait for drawing storage backends
#[async_trait]
pub trait DrawingStorage: Send + Sync {
    /// Store content under `key`, replacing anything already there
    async fn store(&self, key: &str, content: &[u8]) -> Result<()>;

    /// Retrieve content stored under `key`
    async fn retrieve(&self, key: &str) -> Result<Bytes>;

    /// Delete content stored under `key`. Missing blobs are not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Build the storage key for a drawing.
pub fn drawing_key(owner: UserId, id: DrawingId, file_name: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase());

    match ext {
        Some(ext) => format!("{owner}/{id}.{ext}"),
        None => format!("{owner}/{id}"),
    }
}

/// Local filesystem storage backend - stores drawings in a directory
pub struct LocalDrawingStorage {
    base_path: PathBuf,
}

impl LocalDrawingStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Resolve a key inside the base directory, rejecting anything that could escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl DrawingStorage for LocalDrawingStorage {
    async fn store(&self, key: &str, content: &[u8]) -> Result<()> {
        let full_path = self.resolve(key)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;

        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Bytes> {
        let full_path = self.resolve(key)?;

        match fs::read(&full_path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.resolve(key)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_drawing_key_keeps_simple_extensions() {
        let owner = Uuid::new_v4();
        let id = Uuid::new_v4();

        assert_eq!(drawing_key(owner, id, "Peça.PDF"), format!("{owner}/{id}.pdf"));
        assert_eq!(drawing_key(owner, id, "scan"), format!("{owner}/{id}"));
        assert_eq!(drawing_key(owner, id, "weird.p d/f"), format!("{owner}/{id}"));
    }

    #[tokio::test]
    async fn test_store_retrieve_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDrawingStorage::new(dir.path().to_path_buf());
        let key = drawing_key(Uuid::new_v4(), Uuid::new_v4(), "a.png");

        storage.store(&key, b"\x89PNG").await.unwrap();
        assert_eq!(storage.retrieve(&key).await.unwrap(), Bytes::from_static(b"\x89PNG"));

        storage.delete(&key).await.unwrap();
        assert!(matches!(storage.retrieve(&key).await, Err(StorageError::NotFound(_))));

        // Deleting twice is fine
        storage.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDrawingStorage::new(dir.path().to_path_buf());

        for key in ["../etc/passwd", "/etc/passwd", "a/../../b", ""] {
            assert!(matches!(storage.store(key, b"x").await, Err(StorageError::InvalidKey(_))), "{key}");
        }
    }
}
