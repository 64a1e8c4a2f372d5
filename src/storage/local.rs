//! # Almacenamiento Local
//! src/storage/local.rs
//!
//! Guarda originales y resultados en un directorio del disco. Los locators
//! son rutas completas: `<root>/<name>` y `<root>/resized_<name>`.

use super::{ByteStream, FileStorage, ResultSink, StorageError, StorageResult, RESULT_PREFIX};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Backend sobre un directorio local
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ruta de un original
    pub fn original_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Ruta de un resultado
    pub fn result_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}{}", RESULT_PREFIX, name))
    }

    async fn ensure_root(&self) -> StorageResult<()> {
        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(StorageError::PathUnavailable(display(&self.root))),
        }
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn fetch_original(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.original_path(name);
        fs::read(&path)
            .await
            .map_err(|e| StorageError::from_io(e, &display(&path)))
    }

    async fn save_result(&self, bytes: Vec<u8>, name: &str) -> StorageResult<String> {
        self.ensure_root().await?;

        let path = self.result_path(name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::from_io(e, &display(&path)))?;

        Ok(display(&path))
    }

    async fn delete_original(&self, name: &str) -> StorageResult<()> {
        let path = self.original_path(name);
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::from_io(e, &display(&path)))
    }

    async fn delete_result(&self, locator: &str) -> StorageResult<()> {
        fs::remove_file(locator)
            .await
            .map_err(|e| StorageError::from_io(e, locator))
    }

    async fn write_result_to_sink(&self, locator: &str, sink: &mut ResultSink) -> StorageResult<()> {
        let mut file = File::open(locator)
            .await
            .map_err(|e| StorageError::from_io(e, locator))?;

        tokio::io::copy(&mut file, sink)
            .await
            .map_err(|e| StorageError::Backend(format!("{}: {}", locator, e)))?;
        sink.flush()
            .await
            .map_err(|e| StorageError::Backend(format!("{}: {}", locator, e)))?;

        Ok(())
    }

    async fn accept_upload_stream(&self, name: &str, mut stream: ByteStream<'_>) -> StorageResult<String> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|_| StorageError::PathUnavailable(display(&self.root)))?;

        let path = self.original_path(name);
        let path_str = display(&path);
        let file = File::create(&path)
            .await
            .map_err(|e| StorageError::from_io(e, &path_str))?;
        let mut writer = BufWriter::new(file);

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    // Upload cortado: no dejar un original a medias
                    drop(writer);
                    let _ = fs::remove_file(&path).await;
                    return Err(StorageError::Backend(format!("{}: {}", path_str, e)));
                }
            };
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| StorageError::from_io(e, &path_str))?;
        }

        writer
            .flush()
            .await
            .map_err(|e| StorageError::from_io(e, &path_str))?;

        Ok(path_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use std::io;

    fn storage() -> (tempfile::TempDir, LocalFileStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        (dir, storage)
    }

    // ==================== Originals ====================

    #[tokio::test]
    async fn test_upload_then_fetch() {
        let (_dir, storage) = storage();

        let chunks = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let locator = storage
            .accept_upload_stream("a.png", stream::iter(chunks).boxed())
            .await
            .unwrap();

        assert!(locator.ends_with("a.png"));
        let bytes = storage.fetch_original("a.png").await.unwrap();
        assert_eq!(bytes, b"hello world");
    }

    #[tokio::test]
    async fn test_upload_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("nested/files"));

        let chunks = vec![Ok(Bytes::from_static(b"x"))];
        storage
            .accept_upload_stream("a.png", stream::iter(chunks).boxed())
            .await
            .unwrap();

        assert!(storage.original_path("a.png").exists());
    }

    #[tokio::test]
    async fn test_upload_stream_error_removes_partial_file() {
        let (_dir, storage) = storage();

        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let result = storage
            .accept_upload_stream("a.png", stream::iter(chunks).boxed())
            .await;

        assert!(result.is_err());
        assert!(!storage.original_path("a.png").exists());
    }

    #[tokio::test]
    async fn test_fetch_missing_original() {
        let (_dir, storage) = storage();
        let err = storage.fetch_original("missing.png").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("Not found"));
    }

    #[tokio::test]
    async fn test_delete_original_twice() {
        let (_dir, storage) = storage();
        std::fs::write(storage.original_path("a.png"), b"x").unwrap();

        storage.delete_original("a.png").await.unwrap();
        let err = storage.delete_original("a.png").await.unwrap_err();
        assert!(err.is_not_found());
    }

    // ==================== Results ====================

    #[tokio::test]
    async fn test_save_result_uses_prefix() {
        let (dir, storage) = storage();

        let locator = storage.save_result(b"data".to_vec(), "a.png").await.unwrap();
        assert_eq!(
            PathBuf::from(&locator),
            dir.path().join("resized_a.png")
        );
    }

    #[tokio::test]
    async fn test_save_result_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("does-not-exist"));

        let err = storage.save_result(b"data".to_vec(), "a.png").await.unwrap_err();
        assert!(matches!(err, StorageError::PathUnavailable(_)));
    }

    #[tokio::test]
    async fn test_write_result_to_sink() {
        let (_dir, storage) = storage();
        let locator = storage.save_result(b"result-bytes".to_vec(), "a.png").await.unwrap();

        let mut sink: Vec<u8> = Vec::new();
        storage.write_result_to_sink(&locator, &mut sink).await.unwrap();
        assert_eq!(sink, b"result-bytes");
    }

    #[tokio::test]
    async fn test_write_missing_result_to_sink() {
        let (_dir, storage) = storage();
        let mut sink: Vec<u8> = Vec::new();
        let err = storage
            .write_result_to_sink("/nonexistent/resized_a.png", &mut sink)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_result_twice() {
        let (_dir, storage) = storage();
        let locator = storage.save_result(b"data".to_vec(), "a.png").await.unwrap();

        storage.delete_result(&locator).await.unwrap();
        let err = storage.delete_result(&locator).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
