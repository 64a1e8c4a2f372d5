//! # Almacenamiento de Archivos
//! src/storage/mod.rs
//!
//! Abstracción sobre el backend donde viven las imágenes originales y los
//! resultados redimensionados. El backend se elige una vez al arrancar y se
//! inyecta tanto en los handlers HTTP como en los workers.
//!
//! ## Backends
//!
//! - `local`: directorio en disco (`LocalFileStorage`)
//! - `amazon`: bucket S3 o compatible (`S3FileStorage`), con los originales
//!   en staging local

pub mod local;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::io;
use std::sync::Arc;
use tokio::io::AsyncWrite;

pub use local::LocalFileStorage;
pub use s3::{S3FileStorage, S3Settings};

/// Prefijo que reciben los resultados redimensionados
pub const RESULT_PREFIX: &str = "resized_";

/// Stream de bytes entrante (upload)
pub type ByteStream<'a> = BoxStream<'a, io::Result<Bytes>>;

/// Sink donde se escribe un resultado (respuesta HTTP, archivo, buffer)
pub type ResultSink = dyn AsyncWrite + Send + Unpin;

/// Errores del almacenamiento
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// El objeto pedido no existe
    #[error("Not found {0}")]
    NotFound(String),

    /// El directorio raíz o el bucket no están disponibles
    #[error("Path unavailable {0}")]
    PathUnavailable(String),

    /// Fallo de red contra el backend remoto
    #[error("Connection error for AWS: {0}")]
    Connection(String),

    /// Cualquier otro fallo de I/O
    #[error("Storage error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Traduce un error de I/O local usando `path` como contexto
    pub(crate) fn from_io(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Backend(format!("{}: {}", path, err)),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Contrato común de los backends de almacenamiento
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Lee los bytes de un original por nombre
    async fn fetch_original(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Guarda un resultado como `resized_<name>` y retorna su locator
    async fn save_result(&self, bytes: Vec<u8>, name: &str) -> StorageResult<String>;

    /// Elimina un original
    async fn delete_original(&self, name: &str) -> StorageResult<()>;

    /// Elimina un resultado por locator
    async fn delete_result(&self, locator: &str) -> StorageResult<()>;

    /// Copia un resultado hacia `sink` en streaming
    async fn write_result_to_sink(&self, locator: &str, sink: &mut ResultSink) -> StorageResult<()>;

    /// Persiste un upload entrante y retorna el locator del original
    async fn accept_upload_stream(&self, name: &str, stream: ByteStream<'_>) -> StorageResult<String>;
}

/// Construye clientes de almacenamiento
///
/// Cada worker llama `connect` dentro de su propio hilo, de modo que ningún
/// cliente cruza fronteras de hilo.
#[async_trait]
pub trait StorageFactory: Send + Sync {
    async fn connect(&self) -> StorageResult<Arc<dyn FileStorage>>;
}

/// Configuración plana del backend, usable como factory
#[derive(Debug, Clone)]
pub enum StorageSettings {
    Local { root: String },
    Amazon(S3Settings),
}

impl StorageSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageSettings::Local { .. } => "local",
            StorageSettings::Amazon(_) => "amazon",
        }
    }
}

#[async_trait]
impl StorageFactory for StorageSettings {
    async fn connect(&self) -> StorageResult<Arc<dyn FileStorage>> {
        match self {
            StorageSettings::Local { root } => Ok(Arc::new(LocalFileStorage::new(root))),
            StorageSettings::Amazon(settings) => {
                Ok(Arc::new(S3FileStorage::connect(settings.clone()).await?))
            }
        }
    }
}
