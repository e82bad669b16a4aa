use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use std::path::{Path, PathBuf};

/// Filesystem storage rooted at `base_path`. Absolute paths are used as given.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        tokio::fs::read(&full_path)
            .await
            .map_err(|e| EtlError::ReadError {
                source_name: full_path.display().to_string(),
                message: e.to_string(),
            })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);
        let write_error = |e: std::io::Error| EtlError::WriteError {
            path: full_path.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }

        tokio::fs::write(&full_path, data).await.map_err(write_error)?;
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let full_path = self.resolve(path);
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EtlError::WriteError {
                path: full_path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_directories_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy());

        storage.write_file("nested/out.json", b"[]").await.unwrap();
        assert_eq!(storage.read_file("nested/out.json").await.unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy());

        let err = storage.read_file("absent.json").await.unwrap_err();
        assert!(matches!(err, EtlError::ReadError { .. }));
    }

    #[tokio::test]
    async fn test_remove_file_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy());

        storage.write_file("stale.json", b"[]").await.unwrap();
        storage.remove_file("stale.json").await.unwrap();
        assert!(!dir.path().join("stale.json").exists());
        storage.remove_file("stale.json").await.unwrap();
    }
}
