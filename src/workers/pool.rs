//! # Pool de Workers
//! src/workers/pool.rs
//!
//! Número fijo de hilos del sistema operativo que ejecutan el redimensionado.
//! Cada envío lleva solo valores planos (`ResizeTask`); cada worker construye
//! su propio cliente de almacenamiento y su propio runtime de un hilo para
//! manejarlo, así que ningún cliente cruza fronteras de hilo.
//!
//! `shutdown` cierra la entrada y espera a que los workers terminen lo que
//! ya tenían encolado.

use crate::resize::{resize_job, ResizeOutcome, ResizeTask};
use crate::storage::{FileStorage, StorageFactory};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

/// Un trabajo más el canal de respuesta
struct WorkItem {
    task: ResizeTask,
    reply: oneshot::Sender<ResizeOutcome>,
}

/// Pool de hilos para redimensionado
pub struct WorkerPool {
    sender: Mutex<Option<Sender<WorkItem>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
    busy: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Lanza `size` workers
    pub fn start(size: usize, factory: Arc<dyn StorageFactory>) -> std::io::Result<Self> {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<WorkItem>();
        let receiver = Arc::new(Mutex::new(receiver));
        let busy = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let name = format!("resize-worker-{}", i);
            let receiver = Arc::clone(&receiver);
            let factory = Arc::clone(&factory);
            let busy = Arc::clone(&busy);

            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(name, receiver, factory, busy))?;
            workers.push(handle);
        }

        tracing::info!(workers = size, "worker pool started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            size,
            busy,
        })
    }

    /// Envía un trabajo y espera su resultado
    pub async fn submit(&self, task: ResizeTask) -> ResizeOutcome {
        let (reply, response) = oneshot::channel();
        let job_id = task.job_id.clone();

        let sent = {
            let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            match sender.as_ref() {
                Some(sender) => sender.send(WorkItem { task, reply }).is_ok(),
                None => false,
            }
        };

        if !sent {
            tracing::warn!(job_id = %job_id, "submit after pool shutdown");
            return ResizeOutcome::failed("worker pool is shut down");
        }

        response
            .await
            .unwrap_or_else(|_| ResizeOutcome::failed("worker stopped before finishing the job"))
    }

    /// Número de workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers ocupados en este momento
    pub fn busy(&self) -> usize {
        self.busy.load(Ordering::SeqCst)
    }

    /// Cierra la entrada y espera a todos los workers
    ///
    /// Bloquea el hilo actual; desde async usar `spawn_blocking`.
    pub fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());

        let workers: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for handle in workers {
            let name = handle.thread().name().unwrap_or("resize-worker").to_string();
            if handle.join().is_err() {
                tracing::error!(worker = %name, "worker panicked");
            }
        }

        tracing::info!("worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Cerrar la entrada para que los hilos terminen solos
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

/// Loop principal del worker
fn worker_loop(
    name: String,
    receiver: Arc<Mutex<Receiver<WorkItem>>>,
    factory: Arc<dyn StorageFactory>,
    busy: Arc<AtomicUsize>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(worker = %name, error = %e, "could not build worker runtime");
            return;
        }
    };

    tracing::debug!(worker = %name, "worker started");
    let mut storage: Option<Arc<dyn FileStorage>> = None;

    loop {
        let item = {
            let receiver = match receiver.lock() {
                Ok(receiver) => receiver,
                Err(_) => break,
            };
            match receiver.recv() {
                Ok(item) => item,
                // Canal cerrado y vacío
                Err(_) => break,
            }
        };

        busy.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(worker = %name, job_id = %item.task.job_id, "worker picked up job");

        let outcome = runtime.block_on(run_task(&mut storage, factory.as_ref(), &item.task));

        busy.fetch_sub(1, Ordering::SeqCst);

        if item.reply.send(outcome).is_err() {
            tracing::warn!(worker = %name, "job result dropped, submitter is gone");
        }
    }

    tracing::debug!(worker = %name, "worker stopped");
}

/// Conecta el storage del worker si hace falta y ejecuta el trabajo
async fn run_task(
    storage: &mut Option<Arc<dyn FileStorage>>,
    factory: &dyn StorageFactory,
    task: &ResizeTask,
) -> ResizeOutcome {
    let client = match storage.clone() {
        Some(client) => client,
        None => match factory.connect().await {
            Ok(client) => {
                *storage = Some(Arc::clone(&client));
                client
            }
            Err(e) => return ResizeOutcome::failed(e.to_string()),
        },
    };

    resize_job(client.as_ref(), task).await
}
