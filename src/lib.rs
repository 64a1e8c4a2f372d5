//! # Image Resizer
//! src/lib.rs
//!
//! Servicio que recibe imágenes, las redimensiona fuera del hilo que atiende
//! las peticiones y permite consultar el estado y descargar el resultado.
//!
//! ## Arquitectura
//!
//! El servicio está dividido en módulos especializados:
//! - `config`: Argumentos CLI y variables de entorno
//! - `server`: Router HTTP, estado compartido y ciclo de vida
//! - `jobs`: Registros de jobs, cola de despacho y despachador
//! - `workers`: Pool de hilos para el trabajo CPU-bound
//! - `resize`: Política de parámetros y transformación de imágenes
//! - `storage`: Backends de archivos (local y S3)
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use image_resizer::config::Config;
//! use image_resizer::server::Server;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! Server::new(config).run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod jobs;
pub mod resize;
pub mod server;
pub mod storage;
pub mod workers;
