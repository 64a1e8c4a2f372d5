//! # Store de Jobs en Redis
//! src/jobs/store/redis.rs
//!
//! Cada job es una key `<id>` con el registro JSON como valor. Con retención
//! configurada, cada escritura hace `SET` seguido de `EXPIRE`.
//!
//! Al arrancar, la conexión se reintenta indefinidamente cada 2 segundos.
//! Una vez conectados, los fallos se propagan como `StoreError::Unavailable`.

use super::{JobStore, StoreError, StoreResult};
use crate::jobs::types::JobRecord;
use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, RedisError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::RwLock;

/// Espera entre intentos de conexión
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Store de registros sobre Redis
pub struct RedisJobStore {
    conn: RwLock<Option<MultiplexedConnection>>,
    ttl: Option<Duration>,
}

/// Errores que justifican reintentar la conexión
fn is_transient(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped()
}

fn unavailable(err: RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

impl RedisJobStore {
    /// Conecta a `url`, reintentando mientras el servidor no responda
    ///
    /// Solo los errores de red se reintentan; una URL inválida o credenciales
    /// rechazadas terminan de inmediato.
    pub async fn connect_with_retry(url: &str, ttl: Option<Duration>) -> StoreResult<Self> {
        let client = ::redis::Client::open(url)
            .map_err(|e| StoreError::InvalidConfig(format!("invalid Redis URL: {}", e)))?;

        let mut attempt: u64 = 0;
        let conn = loop {
            attempt += 1;
            match client.get_multiplexed_async_connection().await {
                Ok(conn) => break conn,
                Err(e) if is_transient(&e) => {
                    tracing::error!(
                        attempt,
                        error = %e,
                        "Redis connection failed, retrying in {}s",
                        RECONNECT_DELAY.as_secs()
                    );
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
                Err(e) => return Err(unavailable(e)),
            }
        };

        tracing::info!(attempt, "connected to Redis");
        Ok(Self {
            conn: RwLock::new(Some(conn)),
            ttl,
        })
    }

    /// Segundos de retención para `EXPIRE`
    fn ttl_secs(&self) -> Option<i64> {
        self.ttl.map(|ttl| ttl.as_secs().max(1) as i64)
    }

    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or_else(|| StoreError::Unavailable("connection closed".to_string()))
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn insert(&self, id: &str, record: &JobRecord) -> StoreResult<()> {
        let data = serde_json::to_string(record)?;
        let mut conn = self.connection().await?;

        let _: () = conn.set(id, data).await.map_err(unavailable)?;
        if let Some(secs) = self.ttl_secs() {
            let _: () = conn.expire(id, secs).await.map_err(unavailable)?;
        }

        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<JobRecord>> {
        let mut conn = self.connection().await?;
        let data: Option<String> = conn.get(id).await.map_err(unavailable)?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        conn.exists(id).await.map_err(unavailable)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(id).await.map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn close(&self) {
        if self.conn.write().await.take().is_some() {
            tracing::info!("Redis connection closed");
        }
    }
}
