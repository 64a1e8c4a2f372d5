//! # Almacenamiento S3
//! src/storage/s3.rs
//!
//! Los resultados se suben a `<folder>/resized_<name>` dentro del bucket; los
//! originales se quedan en staging local (`LocalFileStorage`) hasta que el
//! worker los procesa.
//!
//! El cliente del SDK se construye de forma perezosa, una vez por instancia.
//! Cada worker obtiene su propia instancia vía `StorageFactory::connect`.

use super::{
    ByteStream, FileStorage, LocalFileStorage, ResultSink, StorageError, StorageResult,
    RESULT_PREFIX,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream as S3Body;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

/// Parámetros de conexión a S3 (valores planos, clonables entre hilos)
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub folder: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: String,
    /// Endpoint alternativo (MinIO, LocalStack...)
    pub endpoint: Option<String>,
    pub use_ssl: bool,
    /// Directorio local donde se guardan los originales
    pub staging_dir: String,
}

impl S3Settings {
    /// Key de un resultado dentro del bucket
    pub fn result_key(&self, name: &str) -> String {
        let folder = self.folder.trim_matches('/');
        if folder.is_empty() {
            format!("{}{}", RESULT_PREFIX, name)
        } else {
            format!("{}/{}{}", folder, RESULT_PREFIX, name)
        }
    }

    /// URL del endpoint, agregando el esquema según `use_ssl` si falta
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.as_ref().map(|endpoint| {
            if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                endpoint.clone()
            } else {
                let scheme = if self.use_ssl { "https" } else { "http" };
                format!("{}://{}", scheme, endpoint)
            }
        })
    }
}

/// Construye un cliente del SDK a partir de la configuración
pub async fn build_client(settings: &S3Settings) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()));

    if let (Some(access), Some(secret)) = (&settings.access_key, &settings.secret_key) {
        let credentials = Credentials::new(access, secret, None, None, "image_resizer");
        loader = loader.credentials_provider(credentials);
    }

    let shared = loader.load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&shared);

    if let Some(url) = settings.endpoint_url() {
        builder = builder.endpoint_url(url).force_path_style(true);
    }

    Client::from_conf(builder.build())
}

/// Traduce un error del SDK a la taxonomía de almacenamiento
fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, bucket: &str, key: &str) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(ctx) => {
            let status = ctx.raw().status().as_u16();
            match ctx.err().code() {
                Some("NoSuchKey") | Some("NotFound") => StorageError::NotFound(key.to_string()),
                Some("NoSuchBucket") | Some("AccessDenied") => {
                    StorageError::PathUnavailable(bucket.to_string())
                }
                _ if status == 404 => StorageError::NotFound(key.to_string()),
                _ => StorageError::Connection(DisplayErrorContext(&err).to_string()),
            }
        }
        _ => StorageError::Connection(DisplayErrorContext(&err).to_string()),
    }
}

/// Backend sobre un bucket S3
pub struct S3FileStorage {
    settings: S3Settings,
    staging: LocalFileStorage,
    client: OnceCell<Client>,
}

impl S3FileStorage {
    /// Prepara el staging local; el cliente se crea en el primer uso
    pub async fn connect(settings: S3Settings) -> StorageResult<Self> {
        tokio::fs::create_dir_all(&settings.staging_dir)
            .await
            .map_err(|_| StorageError::PathUnavailable(settings.staging_dir.clone()))?;

        Ok(Self {
            staging: LocalFileStorage::new(&settings.staging_dir),
            settings,
            client: OnceCell::new(),
        })
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| build_client(&self.settings))
            .await
    }

    fn bucket(&self) -> &str {
        &self.settings.bucket
    }
}

#[async_trait]
impl FileStorage for S3FileStorage {
    async fn fetch_original(&self, name: &str) -> StorageResult<Vec<u8>> {
        self.staging.fetch_original(name).await
    }

    async fn save_result(&self, bytes: Vec<u8>, name: &str) -> StorageResult<String> {
        let key = self.settings.result_key(name);

        self.client()
            .await
            .put_object()
            .bucket(self.bucket())
            .key(&key)
            .body(S3Body::from(bytes))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, self.bucket(), &key))?;

        tracing::debug!(bucket = %self.bucket(), key = %key, "result uploaded");
        Ok(key)
    }

    async fn delete_original(&self, name: &str) -> StorageResult<()> {
        self.staging.delete_original(name).await
    }

    async fn delete_result(&self, locator: &str) -> StorageResult<()> {
        let client = self.client().await;

        // DeleteObject es idempotente: confirmar existencia antes
        client
            .head_object()
            .bucket(self.bucket())
            .key(locator)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, self.bucket(), locator))?;

        client
            .delete_object()
            .bucket(self.bucket())
            .key(locator)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, self.bucket(), locator))?;

        Ok(())
    }

    async fn write_result_to_sink(&self, locator: &str, sink: &mut ResultSink) -> StorageResult<()> {
        let output = self
            .client()
            .await
            .get_object()
            .bucket(self.bucket())
            .key(locator)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, self.bucket(), locator))?;

        let mut body = output.body;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
        {
            sink.write_all(&chunk)
                .await
                .map_err(|e| StorageError::Backend(format!("{}: {}", locator, e)))?;
        }
        sink.flush()
            .await
            .map_err(|e| StorageError::Backend(format!("{}: {}", locator, e)))?;

        Ok(())
    }

    async fn accept_upload_stream(&self, name: &str, stream: ByteStream<'_>) -> StorageResult<String> {
        self.staging.accept_upload_stream(name, stream).await
    }
}
