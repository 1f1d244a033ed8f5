//! Local disk storage backend

use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::backend::{ByteStream, PresignOperation, StorageBackend};
use crate::error::StorageError;

/// Local disk storage backend
///
/// Maps bucket keys directly onto a directory tree under `base_path`.
/// The `presign` implementation returns a plain `file://` URL; callers
/// should not rely on its authenticity.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).await?;

        info!("Initialized local storage at {:?}", base_path);

        Ok(Self { base_path })
    }

    /// Resolve a bucket key to a file path, rejecting traversal segments
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let traversal = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || traversal {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put(
        &self,
        key: &str,
        mut stream: ByteStream,
        _content_type: &str,
        _content_length: Option<u64>,
    ) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        debug!("Writing object to {:?}", path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a temp file, then rename into place
        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path).await?;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(e);
                }
            };
            file.write_all(&chunk).await?;
        }

        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ByteStream, StorageError> {
        let path = self.object_path(key)?;
        debug!("Streaming object from {:?}", path);

        let file = File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        let reader = BufReader::new(file);
        let stream = tokio_util::io::ReaderStream::new(reader);

        Ok(Box::pin(stream.map(|result| result.map_err(StorageError::Io))))
    }

    async fn head(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        debug!("Deleting object at {:?}", path);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let from_path = self.object_path(from)?;
        let to_path = self.object_path(to)?;
        debug!("Copying {:?} -> {:?}", from_path, to_path);

        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        match fs::copy(&from_path, &to_path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(from.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn presign(
        &self,
        _operation: PresignOperation,
        key: &str,
        _ttl: Duration,
    ) -> Result<String, StorageError> {
        let path = self.object_path(key)?;
        let absolute = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };
        Ok(format!("file://{}", absolute.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    fn byte_stream(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
        ))
    }

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_put_get_head_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let key = "sha256/75/09/abc/e.pdf";

        assert!(!storage.head(key).await.unwrap());

        storage
            .put(key, byte_stream(vec![b"hello ", b"world!"]), "application/pdf", Some(12))
            .await
            .unwrap();
        assert!(storage.head(key).await.unwrap());

        let body = collect(storage.get(key).await.unwrap()).await;
        assert_eq!(body, b"hello world!");

        storage.delete(key).await.unwrap();
        assert!(!storage.head(key).await.unwrap());

        // Idempotent delete
        storage.delete(key).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        match storage.get("sha256/aa/bb/ccc/x.bin").await {
            Err(StorageError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_copy_preserves_source() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .put("staging/a/file.bin", byte_stream(vec![b"data"]), "application/octet-stream", None)
            .await
            .unwrap();
        storage.copy("staging/a/file.bin", "sha256/aa/bb/full/file.bin").await.unwrap();

        assert!(storage.head("staging/a/file.bin").await.unwrap());
        let body = collect(storage.get("sha256/aa/bb/full/file.bin").await.unwrap()).await;
        assert_eq!(body, b"data");
    }

    #[tokio::test]
    async fn test_traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        match storage.head("../outside").await {
            Err(StorageError::InvalidKey(_)) => {}
            other => panic!("expected InvalidKey, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_presign_returns_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let url = storage
            .presign(PresignOperation::Get, "sha256/aa/bb/d/f.pdf", Duration::from_secs(300))
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("f.pdf"));
    }
}
