//! # Sistema de Jobs
//!
//! Ciclo de vida de los jobs de redimensionado: registros persistidos, cola
//! de despacho, despachador y endpoints HTTP.
//!
//! ## Endpoints
//!
//! - `POST /api/v1/image?width=&height=&scale=` - Subir imagen y encolar
//! - `GET /api/v1/image/{id}/check` - Consultar estado
//! - `GET /api/v1/image/{id}` - Descargar resultado

pub mod dispatcher;
pub mod handlers;
pub mod queue;
pub mod store;
pub mod types;

pub use dispatcher::{process_job, Dispatcher};
pub use queue::{DispatchQueue, DispatchReceiver};
pub use store::{FileJobStore, JobStore, RedisJobStore, StoreError};
pub use types::{JobRecord, JobStatus};
