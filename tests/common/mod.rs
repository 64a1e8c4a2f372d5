//! Utilidades compartidas por los tests de integración
//! tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, RgbImage};
use image_resizer::jobs::dispatcher::Dispatcher;
use image_resizer::jobs::queue::{self, DispatchQueue};
use image_resizer::jobs::store::{FileJobStore, JobStore, StoreError, StoreResult};
use image_resizer::jobs::types::{JobRecord, JobStatus};
use image_resizer::server::{build_router, AppState};
use image_resizer::storage::{
    ByteStream, FileStorage, LocalFileStorage, ResultSink, StorageError, StorageFactory,
    StorageResult,
};
use image_resizer::workers::WorkerPool;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const BOUNDARY: &str = "X-IMAGE-RESIZER-BOUNDARY";

/// Storage local con fallos inyectables y una compuerta para originales
/// cuyo nombre contiene `slow`
pub struct TestStorage {
    inner: LocalFileStorage,
    pub fail_save: AtomicBool,
    pub fail_delete: AtomicBool,
    /// Fetches bloqueados en la compuerta ahora mismo
    pub waiting: AtomicUsize,
    gate: Semaphore,
}

impl TestStorage {
    pub fn new(root: &std::path::Path) -> Self {
        Self {
            inner: LocalFileStorage::new(root),
            fail_save: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            waiting: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }

    /// Deja pasar a todos los fetches bloqueados
    pub fn open_gate(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn root(&self) -> &std::path::Path {
        self.inner.root()
    }
}

#[async_trait]
impl FileStorage for TestStorage {
    async fn fetch_original(&self, name: &str) -> StorageResult<Vec<u8>> {
        if name.contains("slow") {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await;
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            drop(permit);
        }
        self.inner.fetch_original(name).await
    }

    async fn save_result(&self, bytes: Vec<u8>, name: &str) -> StorageResult<String> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(StorageError::PathUnavailable(self.root().display().to_string()));
        }
        self.inner.save_result(bytes, name).await
    }

    async fn delete_original(&self, name: &str) -> StorageResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("permission denied".to_string()));
        }
        self.inner.delete_original(name).await
    }

    async fn delete_result(&self, locator: &str) -> StorageResult<()> {
        self.inner.delete_result(locator).await
    }

    async fn write_result_to_sink(&self, locator: &str, sink: &mut ResultSink) -> StorageResult<()> {
        self.inner.write_result_to_sink(locator, sink).await
    }

    async fn accept_upload_stream(&self, name: &str, stream: ByteStream<'_>) -> StorageResult<String> {
        self.inner.accept_upload_stream(name, stream).await
    }
}

/// Factory que entrega siempre la misma instancia (para poder inspeccionarla)
pub struct SharedFactory(pub Arc<TestStorage>);

#[async_trait]
impl StorageFactory for SharedFactory {
    async fn connect(&self) -> StorageResult<Arc<dyn FileStorage>> {
        Ok(self.0.clone())
    }
}

/// Store en archivo cuyo `insert` puede fallar a pedido
pub struct FlakyStore {
    inner: FileJobStore,
    pub fail_insert: AtomicBool,
}

impl FlakyStore {
    pub async fn open(path: &std::path::Path) -> Self {
        Self {
            inner: FileJobStore::open(path, None).await.unwrap(),
            fail_insert: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn insert(&self, id: &str, record: &JobRecord) -> StoreResult<()> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.insert(id, record).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<JobRecord>> {
        self.inner.get(id).await
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        self.inner.exists(id).await
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete(id).await
    }
}

/// Pipeline completo en memoria: store en archivo, pool, despachador
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: Arc<dyn JobStore>,
    pub storage: Arc<TestStorage>,
    pub pool: Arc<WorkerPool>,
    pub queue: DispatchQueue,
    cancel: CancellationToken,
    dispatcher: JoinHandle<()>,
}

impl Harness {
    pub async fn start(workers: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let files = dir.path().join("files");
        std::fs::create_dir_all(&files).unwrap();

        let store: Arc<dyn JobStore> = Arc::new(
            FileJobStore::open(dir.path().join("jobs.json"), None)
                .await
                .unwrap(),
        );
        let storage = Arc::new(TestStorage::new(&files));
        let pool = Arc::new(
            WorkerPool::start(workers, Arc::new(SharedFactory(storage.clone()))).unwrap(),
        );

        let (queue, receiver) = queue::channel();
        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(store.clone(), pool.clone(), receiver);
        let dispatcher = tokio::spawn(dispatcher.run(cancel.clone()));

        Self {
            dir,
            store,
            storage,
            pool,
            queue,
            cancel,
            dispatcher,
        }
    }

    pub fn router(&self, clear_after_serve: bool) -> axum::Router {
        let state = AppState::new(
            self.store.clone(),
            self.storage.clone(),
            self.queue.clone(),
            clear_after_serve,
        );
        build_router(state, 10 * 1024 * 1024)
    }

    /// Deja un original en disco y encola su job directamente
    pub async fn submit(&self, id: &str, file_name: &str, bytes: Vec<u8>, params: image_resizer::resize::ResizeParams) {
        let path = self.storage.root().join(file_name);
        std::fs::write(&path, bytes).unwrap();

        let record = JobRecord::new(
            id.to_string(),
            path.display().to_string(),
            file_name.to_string(),
            params,
        );
        self.store.insert(id, &record).await.unwrap();
        self.queue.enqueue(id).unwrap();
    }

    /// Espera hasta que el job llegue a `status`
    pub async fn wait_for(&self, id: &str, status: JobStatus) -> JobRecord {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(record) = self.store.get(id).await.unwrap() {
                if record.status == status {
                    return record;
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "job {} never reached {:?}",
                id,
                status
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn wait_terminal(&self, id: &str) -> JobRecord {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(record) = self.store.get(id).await.unwrap() {
                if record.is_terminal() {
                    return record;
                }
            }
            assert!(tokio::time::Instant::now() < deadline, "job {} never finished", id);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Detiene el despachador y el pool
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.dispatcher.await.unwrap();
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || pool.shutdown()).await.unwrap();
    }
}

/// PNG negro de `width`×`height`
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Dimensiones de una imagen codificada
pub fn dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

/// Body multipart con un campo `file`
pub fn multipart_body(file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Body multipart con `file_name` de texto antes del archivo
pub fn multipart_body_with_name(declared: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"file_name\"\r\n\r\n");
    body.extend_from_slice(declared.as_bytes());
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"\r\n");
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(query: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/image?{}", query))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(router: &axum::Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
