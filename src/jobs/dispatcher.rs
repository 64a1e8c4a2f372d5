//! # Despachador de Jobs
//! src/jobs/dispatcher.rs
//!
//! Único consumidor de la cola de despacho. Por cada ID:
//!
//! 1. Lee el registro del store
//! 2. Lo marca `resizing` y lo persiste
//! 3. Envía el trabajo al `WorkerPool`
//! 4. Persiste el estado terminal (`done` o `error`)
//!
//! Cada job corre en su propia tarea, así que un redimensionado lento no
//! frena la lectura de la cola. No hay límite de tareas en vuelo: el único
//! freno real es el tamaño del pool.

use crate::jobs::queue::DispatchReceiver;
use crate::jobs::store::{JobStore, StoreResult};
use crate::jobs::types::JobRecord;
use crate::workers::WorkerPool;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub struct Dispatcher {
    store: Arc<dyn JobStore>,
    pool: Arc<WorkerPool>,
    receiver: DispatchReceiver,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn JobStore>, pool: Arc<WorkerPool>, receiver: DispatchReceiver) -> Self {
        Self {
            store,
            pool,
            receiver,
            tracker: TaskTracker::new(),
        }
    }

    /// Tracker de las tareas lanzadas (para esperar su fin desde fuera)
    pub fn tracker(&self) -> TaskTracker {
        self.tracker.clone()
    }

    /// Consume la cola hasta que se cancele `shutdown` o se cierren todos
    /// los productores; al salir espera a los jobs en vuelo.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("dispatcher started");

        loop {
            let job_id = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = self.receiver.recv() => match next {
                    Some(job_id) => job_id,
                    None => break,
                },
            };

            let store = Arc::clone(&self.store);
            let pool = Arc::clone(&self.pool);

            self.tracker.spawn(async move {
                if let Err(e) = process_job(store.as_ref(), &pool, &job_id).await {
                    tracing::error!(job_id = %job_id, error = %e, "job status could not be persisted");
                }
            });
        }

        let left = self.receiver.len();
        if left > 0 {
            tracing::warn!(pending = left, "dispatcher stopping with queued jobs");
        }

        self.tracker.close();
        tracing::info!(in_flight = self.tracker.len(), "dispatcher draining");
        self.tracker.wait().await;
        tracing::info!("dispatcher stopped");
    }
}

/// Procesa un job de principio a fin y retorna su registro final
///
/// Retorna `Ok(None)` si el registro ya no existe.
pub async fn process_job(
    store: &dyn JobStore,
    pool: &WorkerPool,
    job_id: &str,
) -> StoreResult<Option<JobRecord>> {
    let mut record = match store.get(job_id).await? {
        Some(record) => record,
        None => {
            tracing::warn!(job_id = %job_id, "dequeued job has no record, skipping");
            return Ok(None);
        }
    };

    record.mark_resizing();
    store.update(job_id, &record).await?;
    tracing::info!(job_id = %job_id, file = %record.file_name, "job resizing");

    let started = Instant::now();
    let outcome = pool.submit(record.to_task()).await;
    record.apply_outcome(outcome);

    store.update(job_id, &record).await?;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &record.error {
        None => tracing::info!(job_id = %job_id, status = %record.status, elapsed_ms, "job finished"),
        Some(error) => tracing::warn!(
            job_id = %job_id,
            status = %record.status,
            elapsed_ms,
            error = %error,
            "job finished with errors"
        ),
    }

    Ok(Some(record))
}
