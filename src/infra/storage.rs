//! File storage for gallery uploads and avatars.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Blob storage addressed by relative paths such as `gallery/<uuid>.png`.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write `bytes` at `path`, creating parent directories.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> AppResult<()>;

    /// Read the file at `path`; `None` when it does not exist.
    async fn get(&self, path: &str) -> AppResult<Option<Vec<u8>>>;

    /// Remove the file at `path`. Missing files are not an error.
    async fn delete(&self, path: &str) -> AppResult<()>;
}

/// Storage rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative path under the root, rejecting anything that escapes it.
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.as_os_str().is_empty() {
            return Err(AppError::NotFound);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> AppResult<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;
        tracing::debug!(path = %path, "Stored file");
        Ok(())
    }

    async fn get(&self, path: &str) -> AppResult<Option<Vec<u8>>> {
        let target = match self.resolve(path) {
            Ok(target) => target,
            Err(_) => return Ok(None),
        };
        match fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.put("gallery/a.txt", b"hello".to_vec()).await.unwrap();
        assert_eq!(
            storage.get("gallery/a.txt").await.unwrap(),
            Some(b"hello".to_vec())
        );

        storage.delete("gallery/a.txt").await.unwrap();
        assert_eq!(storage.get("gallery/a.txt").await.unwrap(), None);

        // Deleting twice is fine
        storage.delete("gallery/a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        assert!(storage.put("../escape.txt", vec![1]).await.is_err());
        assert_eq!(storage.get("gallery/../../etc/passwd").await.unwrap(), None);
    }
}
