//! # Driver de Redimensionado
//! src/resize/driver.rs
//!
//! Lo que ejecuta un worker por cada job:
//!
//! 1. Leer el original (si falla, el job termina sin resultado)
//! 2. Redimensionar
//! 3. Borrar el original (best-effort, no fatal)
//! 4. Guardar el resultado como `resized_<name>` (fatal si falla)
//!
//! Los errores de los pasos 3 y 4 se combinan con `"; "` en ese orden.

use super::engine::resize_bytes;
use super::params::ResizeParams;
use crate::storage::FileStorage;
use serde::{Deserialize, Serialize};

/// Trabajo enviado al pool: solo valores planos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeTask {
    pub job_id: String,
    pub file_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<u32>,
}

impl ResizeTask {
    pub fn params(&self) -> ResizeParams {
        ResizeParams::new(self.width, self.height, self.scale)
    }
}

/// Resultado de un trabajo: locator del resultado y/o mensaje de error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResizeOutcome {
    pub result_locator: Option<String>,
    pub error: Option<String>,
}

impl ResizeOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            result_locator: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_locator.is_some()
    }
}

/// Ejecuta el redimensionado completo de un job contra `storage`
pub async fn resize_job(storage: &dyn FileStorage, task: &ResizeTask) -> ResizeOutcome {
    let original = match storage.fetch_original(&task.file_name).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(job_id = %task.job_id, error = %e, "original not available");
            return ResizeOutcome::failed(e.to_string());
        }
    };

    let mode = match task.params().into_mode() {
        Ok(mode) => mode,
        Err(e) => return ResizeOutcome::failed(e.to_string()),
    };

    // Si la transformación falla, el original se conserva
    let resized = match resize_bytes(&original, &task.file_name, mode) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(job_id = %task.job_id, error = %e, "resize failed");
            return ResizeOutcome::failed(format!("Resize img err: {}", e));
        }
    };

    let mut errors = Vec::new();

    if let Err(e) = storage.delete_original(&task.file_name).await {
        tracing::warn!(job_id = %task.job_id, error = %e, "could not delete original");
        errors.push(format!("Delete default img err: {}", e));
    }

    let result_locator = match storage.save_result(resized, &task.file_name).await {
        Ok(locator) => Some(locator),
        Err(e) => {
            tracing::error!(job_id = %task.job_id, error = %e, "could not save result");
            errors.push(format!("Save new img err: {}", e));
            None
        }
    };

    ResizeOutcome {
        result_locator,
        error: if errors.is_empty() { None } else { Some(errors.join("; ")) },
    }
}
