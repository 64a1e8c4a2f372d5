//! # Workers
//!
//! Pool de hilos donde corre el trabajo CPU-bound de redimensionado.

pub mod pool;

pub use pool::WorkerPool;

/// Tamaño por defecto del pool: núcleos disponibles
pub fn default_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
