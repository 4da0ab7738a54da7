//! Tetromino Catalog Daemon
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! tetromino-catalog
//!
//! # Start with custom config
//! tetromino-catalog --config /path/to/config.toml
//!
//! # Start with custom HTTP port and storage directory
//! tetromino-catalog --http-port 8091 --storage-dir /srv/tetrominoes
//! ```
//!
//! ## HTTP API
//!
//! - `GET /blocks` - List all shapes
//! - `GET /blocks?block={name}` - Fetch one shape
//! - `POST /blocks` - Add a shape
//! - `GET /health` - Health check

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tetromino_catalog::{CatalogApi, Config, HttpServer, ImageStore, ShapeStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tetromino-catalog")]
#[command(about = "Catalog service for tetromino shapes")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "TETROMINO_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory (holds data/blocks.json and images/)
    #[arg(long, env = "TETROMINO_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "TETROMINO_HTTP_PORT")]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("tetromino_catalog=info".parse()?),
        )
        .init();

    let args = Args::parse();

    // Load config
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        "Starting tetromino-catalog"
    );

    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .with_context(|| format!("creating {}", config.storage_dir.display()))?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let store = Arc::new(ShapeStore::new(config.data_file()));
    let images = Arc::new(ImageStore::new(config.images_dir()));

    // Seed the catalog up front so a broken data directory shows at startup
    let shapes = store.load().await?;
    info!(path = %store.path().display(), shapes = shapes.len(), "Catalog ready");

    let api = Arc::new(CatalogApi::new(store, images));
    let http_server = Arc::new(
        HttpServer::new(api, config.http_addr()).with_max_body_bytes(config.max_body_bytes),
    );

    info!("HTTP API available at http://{}", config.http_addr());
    info!("Endpoints:");
    info!("  GET  /blocks               - List all shapes");
    info!("  GET  /blocks?block={{name}} - Fetch one shape");
    info!("  POST /blocks               - Add a shape");
    info!("  GET  /health               - Health check");
    info!("Press Ctrl+C to stop.");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
                return Err(e.into());
            }
        }
        _ = shutdown => {}
    }

    Ok(())
}
