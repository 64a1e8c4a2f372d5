//! # Store de Jobs en Archivo
//! src/jobs/store/file.rs
//!
//! Persiste los registros en un archivo JSON con cache en memoria. Pensado
//! para despliegues de un solo nodo y para pruebas sin Redis.

use super::{JobStore, StoreError, StoreResult};
use crate::jobs::types::{now_secs, JobRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Registro más su expiración (si hay retención)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    record: JobRecord,
    #[serde(default)]
    expires_at: Option<u64>,
}

impl StoredRecord {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Store de registros sobre un archivo JSON
pub struct FileJobStore {
    /// Ruta al archivo de persistencia
    path: PathBuf,

    /// Cache en memoria
    records: Arc<Mutex<HashMap<String, StoredRecord>>>,

    /// Retención de cada registro
    ttl: Option<Duration>,
}

impl FileJobStore {
    /// Abre el store y carga datos existentes
    pub async fn open(path: impl AsRef<Path>, ttl: Option<Duration>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }

        let records = Self::load_from_file(&path).await;
        tracing::debug!(path = %path.display(), count = records.len(), "job records loaded");

        Ok(Self {
            path,
            records: Arc::new(Mutex::new(records)),
            ttl,
        })
    }

    /// Carga registros desde el archivo; si está corrupto, empieza limpio
    async fn load_from_file(path: &Path) -> HashMap<String, StoredRecord> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(_) => return HashMap::new(),
        };

        match serde_json::from_slice(&data) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt jobs file, starting clean");
                HashMap::new()
            }
        }
    }

    /// Guarda todo el mapa (archivo temporal + rename)
    async fn save_to_file(&self, records: &HashMap<String, StoredRecord>) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(records)?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, data)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", temp_path.display(), e)))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", self.path.display(), e)))?;

        Ok(())
    }

    fn expires_at(&self, now: u64) -> Option<u64> {
        self.ttl.map(|ttl| now + ttl.as_secs())
    }

    /// Número de registros vivos
    pub async fn count(&self) -> usize {
        let now = now_secs();
        let records = self.records.lock().await;
        records.values().filter(|r| !r.is_expired(now)).count()
    }
}

impl Clone for FileJobStore {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            records: Arc::clone(&self.records),
            ttl: self.ttl,
        }
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn insert(&self, id: &str, record: &JobRecord) -> StoreResult<()> {
        let now = now_secs();
        let mut records = self.records.lock().await;

        records.retain(|_, r| !r.is_expired(now));
        records.insert(
            id.to_string(),
            StoredRecord {
                record: record.clone(),
                expires_at: self.expires_at(now),
            },
        );

        self.save_to_file(&records).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<JobRecord>> {
        let now = now_secs();
        let records = self.records.lock().await;
        Ok(records
            .get(id)
            .filter(|r| !r.is_expired(now))
            .map(|r| r.record.clone()))
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.get(id).await?.is_some())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let now = now_secs();
        let mut records = self.records.lock().await;

        let removed = records.remove(id);
        let existed = removed.as_ref().is_some_and(|r| !r.is_expired(now));

        if removed.is_some() {
            self.save_to_file(&records).await?;
        }

        Ok(existed)
    }
}
