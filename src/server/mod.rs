//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Arma el router de axum y coordina el ciclo de vida completo:
//! 1. Conecta el store de registros (reintentando)
//! 2. Prepara el backend de archivos
//! 3. Arranca el pool de workers y el despachador
//! 4. Sirve HTTP hasta recibir Ctrl-C / SIGTERM
//! 5. Drena los jobs en vuelo, apaga el pool y cierra el store

pub mod error;
pub mod state;

use crate::config::{Config, RecordStoreKind};
use crate::jobs::dispatcher::Dispatcher;
use crate::jobs::handlers;
use crate::jobs::queue;
use crate::jobs::store::{FileJobStore, JobStore, RedisJobStore};
use crate::storage::StorageFactory;
use crate::workers::WorkerPool;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use error::{AppError, AppResult};
pub use state::AppState;

/// Construye el router con todas las rutas
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/v1/image", post(handlers::upload_handler))
        .route("/api/v1/image/{id}", get(handlers::result_handler))
        .route("/api/v1/image/{id}/check", get(handlers::status_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Conecta el store de registros configurado
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn JobStore>> {
    let ttl = config.record_ttl();

    let store: Arc<dyn JobStore> = match config.record_store {
        RecordStoreKind::Redis => {
            tracing::info!(host = %config.redis_host, port = config.redis_port, "connecting to Redis");
            Arc::new(RedisJobStore::connect_with_retry(&config.redis_url(), ttl).await?)
        }
        RecordStoreKind::File => {
            tracing::info!(path = %config.jobs_storage_path, "using file record store");
            Arc::new(FileJobStore::open(&config.jobs_storage_path, ttl).await?)
        }
    };

    Ok(store)
}

/// Servidor de redimensionado
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Corre hasta recibir una señal de apagado
    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.config;

        let store = connect_store(&config).await?;

        let settings = config.storage_settings();
        let storage = settings
            .connect()
            .await
            .with_context(|| format!("could not prepare {} storage", settings.kind()))?;
        tracing::info!(kind = settings.kind(), "file storage ready");

        let pool = Arc::new(
            WorkerPool::start(config.workers, Arc::new(settings))
                .context("could not start worker pool")?,
        );

        let (queue, receiver) = queue::channel();
        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(Arc::clone(&store), Arc::clone(&pool), receiver);
        let dispatcher_handle = tokio::spawn(dispatcher.run(cancel.clone()));

        let state = AppState::new(Arc::clone(&store), storage, queue, config.clear_after_serve);
        let app = build_router(state, config.max_upload_bytes());

        let listener = tokio::net::TcpListener::bind(config.address())
            .await
            .with_context(|| format!("could not bind {}", config.address()))?;
        tracing::info!(addr = %config.address(), "listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        tracing::info!("server stopped accepting connections, draining jobs");

        cancel.cancel();
        if let Err(e) = dispatcher_handle.await {
            tracing::error!(error = %e, "dispatcher task failed");
        }

        let pool_handle = Arc::clone(&pool);
        tokio::task::spawn_blocking(move || pool_handle.shutdown())
            .await
            .context("worker pool shutdown failed")?;

        store.close().await;
        tracing::info!("graceful shutdown complete");
        Ok(())
    }
}

/// Espera Ctrl-C o SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "could not install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
