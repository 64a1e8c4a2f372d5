//! # Estado Compartido
//! src/server/state.rs

use crate::jobs::queue::DispatchQueue;
use crate::jobs::store::JobStore;
use crate::storage::FileStorage;
use std::sync::Arc;

/// Dependencias que reciben los handlers
#[derive(Clone)]
pub struct AppState {
    /// Store de registros de jobs
    pub store: Arc<dyn JobStore>,

    /// Backend de archivos (el mismo tipo que usan los workers)
    pub storage: Arc<dyn FileStorage>,

    /// Productor de la cola de despacho
    pub queue: DispatchQueue,

    /// Borrar resultado y registro después de servirlos
    pub clear_after_serve: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JobStore>,
        storage: Arc<dyn FileStorage>,
        queue: DispatchQueue,
        clear_after_serve: bool,
    ) -> Self {
        Self {
            store,
            storage,
            queue,
            clear_after_serve,
        }
    }
}
