//! # Errores HTTP
//! src/server/error.rs
//!
//! Traduce los errores internos a respuestas JSON. Los errores de backend
//! nunca llegan crudos al cliente.

use crate::jobs::queue::QueueClosed;
use crate::jobs::store::StoreError;
use crate::resize::ValidationError;
use crate::storage::StorageError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Combinación de parámetros inválida
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Petición mal formada (multipart, campos faltantes)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Job desconocido
    #[error("Job {0} not found")]
    JobNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Queue(#[from] QueueClosed),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(err) => {
                // El cliente espera una lista de mensajes
                let body = json!({ "error": [err.to_string()] });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::JobNotFound(id) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Job {} not found", id),
            ),
            AppError::Store(err) => {
                tracing::error!(error = %err, "record store error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "Job store is unavailable".to_string(),
                )
            }
            AppError::Storage(StorageError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "File not found".to_string(),
            ),
            AppError::Storage(err) => {
                tracing::error!(error = %err, "file storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Queue(err) => {
                tracing::error!(error = %err, "dispatch queue error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SHUTTING_DOWN",
                    "Server is shutting down".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
