//! Reqdocs Storage Daemon
//!
//! Serves the versioned record API over HTTP, backed by a local SQLite file.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! reqdocs-storage
//!
//! # Start with custom config
//! reqdocs-storage --config /path/to/config.toml
//!
//! # Start with custom HTTP port and storage directory
//! reqdocs-storage --http-port 8096 --storage-dir /data/reqdocs
//! ```
//!
//! ## HTTP API
//!
//! - `GET /health` - Health check with record and counter totals
//! - `GET|POST /api/{slug}` - List / create
//! - `GET /api/{slug}/next-code` - Preview the next code
//! - `GET|PUT|DELETE /api/{slug}/{ref}` - Get / update / delete
//!
//! Nested kinds are addressed under their parents, e.g.
//! `/api/organizations/ORG-001/projects/PROJ-001/actors`.

use anyhow::Context;
use clap::Parser;
use reqdocs_storage::services::events::spawn_logging_listener;
use reqdocs_storage::{Config, HttpServer, RecordDb, Services};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reqdocs-storage")]
#[command(about = "Versioned record storage for requirements documents")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "REQDOCS_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "REQDOCS_HTTP_PORT")]
    http_port: Option<u16>,

    /// Maximum pooled SQLite connections
    #[arg(long)]
    pool_size: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("reqdocs_storage=info".parse()?),
        )
        .init();

    let args = Args::parse();

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(size) = args.pool_size {
        config.pool_max_size = size;
    }

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        pool_max_size = config.pool_max_size,
        "Starting reqdocs-storage"
    );

    // Ensure storage directory exists
    tokio::fs::create_dir_all(&config.storage_dir).await?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    // Open record database
    let db = Arc::new(
        RecordDb::open(&config.db_path(), &config.db_options())
            .context("Failed to open record database")?,
    );
    if config.recover_malformed_versions {
        info!("Malformed stored versions will be restarted on update");
    }

    let services = Arc::new(Services::with_options(
        db.clone(),
        config.recover_malformed_versions,
    ));
    let listener = spawn_logging_listener(services.events.clone());

    // Start HTTP server
    let http_addr: SocketAddr = format!("{}:{}", config.bind_address, config.http_port)
        .parse()
        .context("Invalid bind address")?;
    let http_server = Arc::new(HttpServer::new(services.clone(), http_addr));

    info!("HTTP API available at http://{}", http_addr);
    info!("Press Ctrl+C to stop.");

    // Handle shutdown signal
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }

    listener.abort();

    // Print stats before exit
    if let Ok(stats) = db.stats() {
        info!(
            records = stats.record_count,
            counters = stats.counter_count,
            "Final storage stats"
        );
    }

    Ok(())
}
