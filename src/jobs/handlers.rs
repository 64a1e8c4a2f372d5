//! # Handlers HTTP para Jobs
//! src/jobs/handlers.rs
//!
//! Implementa los endpoints del sistema de jobs:
//! - `POST /api/v1/image?width=&height=&scale=` (multipart)
//! - `GET /api/v1/image/{id}/check`
//! - `GET /api/v1/image/{id}`

use crate::jobs::types::{new_job_id, now_secs, JobRecord, JobStatus};
use crate::resize::engine::output_format;
use crate::resize::ResizeParams;
use crate::server::error::{AppError, AppResult};
use crate::server::state::AppState;
use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::{StreamExt, TryStreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::OnceLock;
use tokio::sync::oneshot;
use tokio_util::io::ReaderStream;

/// Tamaño del buffer entre el storage y la respuesta
const STREAM_BUFFER: usize = 64 * 1024;

/// Respuesta de upload y de consulta de estado
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub id: String,
    pub status: JobStatus,
}

impl From<&JobRecord> for JobStatusResponse {
    fn from(record: &JobRecord) -> Self {
        Self {
            id: record.id.clone(),
            status: record.status,
        }
    }
}

/// Limpia un nombre subido: solo el último componente y caracteres seguros
pub fn sanitize_file_name(name: &str) -> String {
    static UNSAFE_CHARS: OnceLock<Option<Regex>> = OnceLock::new();

    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    match UNSAFE_CHARS.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").ok()) {
        Some(re) => re.replace_all(base, "_").into_owned(),
        None => base.to_string(),
    }
}

/// Nombre con que se guarda un original: `<timestamp>-<id>-<nombre>`
///
/// El ID del job hace único el nombre aunque dos uploads iguales lleguen en
/// el mismo segundo.
pub fn stored_file_name(name: &str, timestamp: u64, job_id: &str) -> String {
    format!("{}-{}-{}", timestamp, job_id, sanitize_file_name(name))
}

/// Handler para `POST /api/v1/image`
///
/// Los parámetros se validan antes de tocar el storage o la cola. El
/// multipart acepta un campo de texto `file_name` opcional seguido del
/// campo `file` con los bytes.
///
/// # Ejemplo de response (201)
/// ```json
/// {"id": "5f0c2d1e-8a3b", "status": "loaded"}
/// ```
pub async fn upload_handler(
    State(state): State<AppState>,
    Query(params): Query<ResizeParams>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<JobStatusResponse>)> {
    let params = params.normalized();
    params.validate()?;

    let mut declared_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("file_name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                declared_name = Some(text);
            }
            Some("file") => {
                let response = accept_upload(&state, field, declared_name, params).await?;
                return Ok((StatusCode::CREATED, Json(response)));
            }
            _ => continue,
        }
    }

    Err(AppError::BadRequest("missing multipart field: file".to_string()))
}

/// Persiste el original, crea el registro y lo encola
async fn accept_upload(
    state: &AppState,
    field: Field<'_>,
    declared_name: Option<String>,
    params: ResizeParams,
) -> AppResult<JobStatusResponse> {
    let name = declared_name
        .or_else(|| field.file_name().map(str::to_string))
        .map(|n| sanitize_file_name(&n))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing file name".to_string()))?;

    output_format(&name)
        .map_err(|_| AppError::BadRequest(format!("unsupported image format: {}", name)))?;

    let id = new_job_id();
    let file_name = stored_file_name(&name, now_secs(), &id);
    let stream = field.map_err(io::Error::other).boxed();
    let source_locator = state.storage.accept_upload_stream(&file_name, stream).await?;

    let record = JobRecord::new(id.clone(), source_locator, file_name, params);

    if let Err(e) = state.store.insert(&id, &record).await {
        discard_original(state, &id, &record.file_name).await;
        return Err(e.into());
    }

    if let Err(e) = state.queue.enqueue(id.clone()) {
        if let Err(store_err) = state.store.delete(&id).await {
            tracing::error!(job_id = %id, error = %store_err, "could not delete unqueued record");
        }
        discard_original(state, &id, &record.file_name).await;
        return Err(e.into());
    }

    tracing::info!(job_id = %id, file = %record.file_name, "image loaded");
    Ok(JobStatusResponse::from(&record))
}

/// Borra un original que ya no tiene job que lo procese
async fn discard_original(state: &AppState, job_id: &str, file_name: &str) {
    if let Err(e) = state.storage.delete_original(file_name).await {
        tracing::error!(job_id = %job_id, error = %e, "could not delete orphaned original");
    }
}

/// Handler para `GET /api/v1/image/{id}/check`
pub async fn status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<JobStatusResponse>> {
    let record = state
        .store
        .get(&id)
        .await?
        .ok_or(AppError::JobNotFound(id))?;

    Ok(Json(JobStatusResponse::from(&record)))
}

/// Handler para `GET /api/v1/image/{id}`
///
/// Si el job no terminó, responde como `status_handler`. Si terminó, envía
/// el resultado en streaming y, con `clear_after_serve`, borra resultado y
/// registro al terminar de enviarlo.
pub async fn result_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let record = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| AppError::JobNotFound(id.clone()))?;

    let locator = match (&record.status, &record.result_locator) {
        (JobStatus::Done, Some(locator)) => locator.clone(),
        _ => return Ok(Json(JobStatusResponse::from(&record)).into_response()),
    };

    let (mut writer, reader) = tokio::io::duplex(STREAM_BUFFER);
    let (done_tx, done_rx) = oneshot::channel::<Result<(), String>>();

    let storage = state.storage.clone();
    let store = state.store.clone();
    let clear = state.clear_after_serve;

    tokio::spawn(async move {
        let result = storage.write_result_to_sink(&locator, &mut writer).await;
        drop(writer);

        if let Err(e) = result {
            tracing::error!(job_id = %id, error = %e, "could not stream result");
            let _ = done_tx.send(Err(e.to_string()));
            return;
        }
        let _ = done_tx.send(Ok(()));

        if clear {
            if let Err(e) = storage.delete_result(&locator).await {
                tracing::error!(job_id = %id, error = %e, "could not delete served result");
            }
            if let Err(e) = store.delete(&id).await {
                tracing::error!(job_id = %id, error = %e, "could not delete served record");
            }
        }
    });

    // Un fallo del storage corta el body con error en vez de cerrarlo limpio
    let tail = futures::stream::once(async move {
        match done_rx.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(Err(io::Error::other(e))),
            Err(_) => Some(Err(io::Error::other("result stream aborted"))),
        }
    })
    .filter_map(futures::future::ready);

    let body = Body::from_stream(ReaderStream::new(reader).chain(tail));

    let content_type = output_format(&record.file_name)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");
    let disposition = format!("attachment; filename=\"{}\"", record.file_name);

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Handler para `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "queued": state.queue.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_safe_names() {
        assert_eq!(sanitize_file_name("photo-01.PNG"), "photo-01.PNG");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_chars() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\a.png"), "a.png");
    }

    #[test]
    fn test_stored_file_name() {
        assert_eq!(
            stored_file_name("a b.png", 1700000000, "5f0c2d1e-8a3b"),
            "1700000000-5f0c2d1e-8a3b-a_b.png"
        );
    }

    #[test]
    fn test_stored_file_name_unique_per_job() {
        let first = stored_file_name("photo.png", 1700000000, "aaaaaaaa-0001");
        let second = stored_file_name("photo.png", 1700000000, "aaaaaaaa-0002");
        assert_ne!(first, second);
    }

    #[test]
    fn test_status_response_serialization() {
        let response = JobStatusResponse {
            id: "abc".to_string(),
            status: JobStatus::Loaded,
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"id":"abc","status":"loaded"}"#
        );
    }
}
