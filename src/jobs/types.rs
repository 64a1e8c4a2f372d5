//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define el registro de un job de redimensionado y su ciclo de vida.
//!
//! ```text
//! loaded --(dequeue)--> resizing --(ok)--> done
//!                                \--(fallo)--> error
//! ```

use crate::resize::{ResizeOutcome, ResizeParams, ResizeTask};
use serde::{Deserialize, Serialize};

/// Estado de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Original subido, esperando en la cola
    Loaded,

    /// Un worker lo está procesando
    Resizing,

    /// Resultado disponible
    Done,

    /// Falló; no hay resultado
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Loaded => "loaded",
            JobStatus::Resizing => "resizing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registro persistido de un job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// ID corto del job
    pub id: String,

    /// Estado actual
    pub status: JobStatus,

    /// Dónde quedó guardado el original
    pub source_locator: String,

    /// Nombre con que se guardó el original (`<timestamp>-<id>-<nombre>`)
    pub file_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    /// Locator del resultado (solo cuando `status == Done`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_locator: Option<String>,

    /// Mensaje de error del último intento
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Timestamp de creación
    pub created_at: u64,

    #[serde(default)]
    pub started_at: Option<u64>,

    #[serde(default)]
    pub finished_at: Option<u64>,
}

/// Segundos desde epoch
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Genera un ID corto: los primeros 13 caracteres de un UUID v4
pub fn new_job_id() -> String {
    let mut id = uuid::Uuid::new_v4().to_string();
    id.truncate(13);
    id
}

impl JobRecord {
    /// Crea un registro nuevo en estado `loaded`
    pub fn new(id: String, source_locator: String, file_name: String, params: ResizeParams) -> Self {
        let params = params.normalized();
        Self {
            id,
            status: JobStatus::Loaded,
            source_locator,
            file_name,
            width: params.width,
            height: params.height,
            scale: params.scale,
            result_locator: None,
            error: None,
            created_at: now_secs(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn params(&self) -> ResizeParams {
        ResizeParams::new(self.width, self.height, self.scale)
    }

    /// Trabajo que se envía al pool
    pub fn to_task(&self) -> ResizeTask {
        ResizeTask {
            job_id: self.id.clone(),
            file_name: self.file_name.clone(),
            width: self.width,
            height: self.height,
            scale: self.scale,
        }
    }

    /// Marca el job como en proceso
    pub fn mark_resizing(&mut self) {
        self.status = JobStatus::Resizing;
        self.started_at = Some(now_secs());
    }

    /// Marca el job como completado; `note` conserva avisos no fatales
    pub fn mark_done(&mut self, result_locator: String, note: Option<String>) {
        self.status = JobStatus::Done;
        self.result_locator = Some(result_locator);
        self.error = note;
        self.finished_at = Some(now_secs());
    }

    /// Marca el job como fallido
    pub fn mark_error(&mut self, error: String) {
        self.status = JobStatus::Error;
        self.result_locator = None;
        self.error = Some(error);
        self.finished_at = Some(now_secs());
    }

    /// Aplica el resultado de un worker
    pub fn apply_outcome(&mut self, outcome: ResizeOutcome) {
        match outcome.result_locator {
            Some(locator) => self.mark_done(locator, outcome.error),
            None => self.mark_error(
                outcome
                    .error
                    .unwrap_or_else(|| "resize produced no result".to_string()),
            ),
        }
    }

    /// Verifica si el job está en estado terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Done | JobStatus::Error)
    }

    /// `result_locator` existe si y solo si el job terminó bien
    pub fn is_consistent(&self) -> bool {
        self.result_locator.is_some() == (self.status == JobStatus::Done)
    }
}
