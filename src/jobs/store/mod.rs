//! # Store de Registros de Jobs
//! src/jobs/store/mod.rs
//!
//! Mapa durable `id -> JobRecord` serializado como JSON. Cada escritura
//! reemplaza el registro completo (last-write-wins) y, si hay retención
//! configurada, renueva su expiración.
//!
//! ## Implementaciones
//!
//! - `RedisJobStore`: Redis, con reconexión infinita al arrancar
//! - `FileJobStore`: archivo JSON local con escritura atómica

pub mod file;
pub mod redis;

use crate::jobs::types::JobRecord;
use async_trait::async_trait;

pub use self::file::FileJobStore;
pub use self::redis::RedisJobStore;

/// Errores del store de registros
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// El store no responde (solo después del arranque)
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// Registro corrupto o imposible de serializar
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Contrato del store de registros de jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserta o reemplaza un registro
    async fn insert(&self, id: &str, record: &JobRecord) -> StoreResult<()>;

    /// Igual que `insert`: reemplazo completo
    async fn update(&self, id: &str, record: &JobRecord) -> StoreResult<()> {
        self.insert(id, record).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<JobRecord>>;

    async fn exists(&self, id: &str) -> StoreResult<bool>;

    /// Elimina un registro; retorna `true` si existía
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Libera la conexión
    async fn close(&self) {}
}
