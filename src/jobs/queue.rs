//! # Cola de Despacho
//! src/jobs/queue.rs
//!
//! Cola FIFO en proceso de IDs de jobs. Muchos productores (los handlers de
//! upload) y un único consumidor (el `Dispatcher`). No tiene límite de
//! capacidad.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// La cola ya no tiene consumidor
#[derive(Debug, thiserror::Error)]
#[error("dispatch queue closed, job {0} not queued")]
pub struct QueueClosed(pub String);

/// Extremo productor (clonable)
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    sender: mpsc::UnboundedSender<String>,
    pending: Arc<AtomicUsize>,
}

/// Extremo consumidor (único)
#[derive(Debug)]
pub struct DispatchReceiver {
    receiver: mpsc::UnboundedReceiver<String>,
    pending: Arc<AtomicUsize>,
}

/// Crea una cola nueva
pub fn channel() -> (DispatchQueue, DispatchReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));

    (
        DispatchQueue {
            sender,
            pending: Arc::clone(&pending),
        },
        DispatchReceiver { receiver, pending },
    )
}

impl DispatchQueue {
    /// Encola un ID de job
    pub fn enqueue(&self, job_id: impl Into<String>) -> Result<(), QueueClosed> {
        let job_id = job_id.into();
        self.pending.fetch_add(1, Ordering::SeqCst);

        self.sender.send(job_id).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            QueueClosed(e.0)
        })
    }

    /// Jobs esperando a ser tomados
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DispatchReceiver {
    /// Espera el siguiente ID; `None` cuando todos los productores se fueron
    pub async fn recv(&mut self) -> Option<String> {
        let job_id = self.receiver.recv().await?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(job_id)
    }

    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
