//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servicio con soporte completo
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./image_resizer --port 8080 \
//!   --record-store redis \
//!   --redis-host localhost \
//!   --storage-type local \
//!   --files-path ./data/files \
//!   --workers 4
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! PORT=8080 STORAGE_TYPE=amazon AWS_BUCKET=images FILES_CLEAR=true ./image_resizer
//! ```

use crate::storage::{S3Settings, StorageSettings};
use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Dónde se guardan los registros de jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordStoreKind {
    Redis,
    File,
}

/// Backend de archivos
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    Local,
    Amazon,
}

/// Configuración del servicio de redimensionado
#[derive(Debug, Clone, Parser)]
#[command(name = "image_resizer")]
#[command(about = "Servicio de redimensionado de imágenes con cola de jobs y pool de workers")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HOST")]
    pub host: String,

    // === Workers ===

    /// Número de workers de redimensionado (por defecto: núcleos disponibles)
    #[arg(long, default_value_t = crate::workers::default_size(), env = "WORKERS")]
    pub workers: usize,

    /// Tamaño máximo de un upload en MB
    #[arg(long = "max-upload-mb", default_value = "50", env = "MAX_UPLOAD_MB")]
    pub max_upload_mb: usize,

    // === Store de registros ===

    /// Backend de registros de jobs
    #[arg(long = "record-store", value_enum, default_value = "redis", env = "RECORD_STORE")]
    pub record_store: RecordStoreKind,

    #[arg(long = "redis-host", default_value = "localhost", env = "REDIS_HOST")]
    pub redis_host: String,

    #[arg(long = "redis-port", default_value = "6379", env = "REDIS_PORT")]
    pub redis_port: u16,

    #[arg(long = "redis-password", env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    /// Retención de registros en minutos (sin valor: no expiran)
    #[arg(long = "redis-timeout", env = "REDIS_TIMEOUT")]
    pub redis_timeout_mins: Option<u64>,

    /// Ruta del archivo de persistencia de jobs (record store `file`)
    #[arg(long = "jobs-storage", default_value = "./data/jobs.json", env = "JOBS_STORAGE")]
    pub jobs_storage_path: String,

    // === Storage ===

    /// Backend de archivos
    #[arg(long = "storage-type", value_enum, default_value = "local", env = "STORAGE_TYPE")]
    pub storage_type: StorageKind,

    /// Directorio de archivos (o staging de originales con `amazon`)
    #[arg(long = "files-path", default_value = "./data/files", env = "TEMP_FILES_PATH")]
    pub files_path: String,

    #[arg(long = "aws-bucket", env = "AWS_BUCKET")]
    pub aws_bucket: Option<String>,

    /// Carpeta dentro del bucket para los resultados
    #[arg(long = "aws-folder", default_value = "", env = "AWS_FOLDER")]
    pub aws_folder: String,

    #[arg(long = "aws-access-key", env = "AWS_ACCESS_KEY")]
    pub aws_access_key: Option<String>,

    #[arg(long = "aws-secret-access", env = "AWS_SECRET_ACCESS", hide_env_values = true)]
    pub aws_secret_access: Option<String>,

    #[arg(long = "aws-region", default_value = "eu-central-1", env = "AWS_REGION")]
    pub aws_region: String,

    /// Endpoint S3 alternativo (MinIO, LocalStack...)
    #[arg(long = "aws-endpoint", env = "AWS_ENDPOINT")]
    pub aws_endpoint: Option<String>,

    #[arg(long = "aws-ssl", env = "AWS_SSL")]
    pub aws_ssl: bool,

    // === Comportamiento ===

    /// Borrar resultado y registro después de servirlos
    #[arg(long = "clear", env = "FILES_CLEAR")]
    pub clear_after_serve: bool,

    /// Logging en nivel debug
    #[arg(long, env = "DEBUG")]
    pub debug: bool,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL de conexión a Redis (la contraseña va url-encoded)
    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(password) if !password.is_empty() => format!(
                "redis://:{}@{}:{}/0",
                urlencoding::encode(password),
                self.redis_host,
                self.redis_port
            ),
            _ => format!("redis://{}:{}/0", self.redis_host, self.redis_port),
        }
    }

    /// Retención de registros
    pub fn record_ttl(&self) -> Option<Duration> {
        self.redis_timeout_mins.map(|mins| Duration::from_secs(mins * 60))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Configuración plana del backend de archivos
    pub fn storage_settings(&self) -> StorageSettings {
        match self.storage_type {
            StorageKind::Local => StorageSettings::Local {
                root: self.files_path.clone(),
            },
            StorageKind::Amazon => StorageSettings::Amazon(S3Settings {
                bucket: self.aws_bucket.clone().unwrap_or_default(),
                folder: self.aws_folder.clone(),
                access_key: self.aws_access_key.clone(),
                secret_key: self.aws_secret_access.clone(),
                region: self.aws_region.clone(),
                endpoint: self.aws_endpoint.clone(),
                use_ssl: self.aws_ssl,
                staging_dir: self.files_path.clone(),
            }),
        }
    }

    /// Filtro de logging por defecto (si `RUST_LOG` no está definido)
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "image_resizer=debug,tower_http=debug"
        } else {
            "image_resizer=info,tower_http=info"
        }
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Workers must be >= 1".to_string());
        }

        if self.max_upload_mb == 0 {
            return Err("Max upload size must be >= 1 MB".to_string());
        }

        if self.redis_timeout_mins == Some(0) {
            return Err("Redis timeout must be > 0 minutes".to_string());
        }

        if self.storage_type == StorageKind::Amazon {
            if self.aws_bucket.as_deref().unwrap_or("").is_empty() {
                return Err("AWS bucket is required for amazon storage".to_string());
            }
            if self.aws_access_key.is_some() != self.aws_secret_access.is_some() {
                return Err("AWS access key and secret must be set together".to_string());
            }
        }

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║              Image Resizer Configuration                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!("   Max upload:   {} MB", self.max_upload_mb);
        println!();
        println!("👷 Workers:");
        println!("   Resize pool:  {} threads", self.workers);
        println!();
        println!("🗃️  Job records:");
        match self.record_store {
            RecordStoreKind::Redis => {
                println!("   Backend:      redis ({}:{})", self.redis_host, self.redis_port);
            }
            RecordStoreKind::File => {
                println!("   Backend:      file ({})", self.jobs_storage_path);
            }
        }
        match self.redis_timeout_mins {
            Some(mins) => println!("   Retention:    {} min", mins),
            None => println!("   Retention:    forever"),
        }
        println!();
        println!("💾 Files:");
        match self.storage_type {
            StorageKind::Local => println!("   Backend:      local ({})", self.files_path),
            StorageKind::Amazon => {
                println!(
                    "   Backend:      amazon (s3://{}/{})",
                    self.aws_bucket.as_deref().unwrap_or("?"),
                    self.aws_folder
                );
                println!("   Region:       {}", self.aws_region);
                println!("   Staging:      {}", self.files_path);
            }
        }
        println!(
            "   Clear served: {}",
            if self.clear_after_serve { "yes" } else { "no" }
        );
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workers: crate::workers::default_size(),
            max_upload_mb: 50,
            record_store: RecordStoreKind::Redis,
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_password: None,
            redis_timeout_mins: None,
            jobs_storage_path: "./data/jobs.json".to_string(),
            storage_type: StorageKind::Local,
            files_path: "./data/files".to_string(),
            aws_bucket: None,
            aws_folder: String::new(),
            aws_access_key: None,
            aws_secret_access: None,
            aws_region: "eu-central-1".to_string(),
            aws_endpoint: None,
            aws_ssl: false,
            clear_after_serve: false,
            debug: false,
        }
    }
}
