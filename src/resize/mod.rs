//! # Redimensionado de Imágenes
//!
//! - `params`: validación de combinaciones de parámetros
//! - `engine`: transformación pura de bytes
//! - `driver`: flujo completo de un job dentro de un worker

pub mod driver;
pub mod engine;
pub mod params;

pub use driver::{resize_job, ResizeOutcome, ResizeTask};
pub use engine::{resize_bytes, target_dimensions, ResizeError};
pub use params::{ResizeMode, ResizeParams, ValidationError};
