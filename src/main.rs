//! # Image Resizer - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servicio de redimensionado.

use image_resizer::config::Config;
use image_resizer::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=================================");
    println!("  Image Resizer");
    println!("  Async resize job pipeline");
    println!("=================================\n");

    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(1);
    }

    config.print_summary();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    Server::new(config).run().await
}
