use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use channel_post_archiver::config::{Config, StorageBackend};
use channel_post_archiver::db::Database;
use channel_post_archiver::ingest::{self, IngestConsumer};
use channel_post_archiver::query::QueryService;
use channel_post_archiver::storage::{MemoryStorage, SqliteStorage, Storage};
use channel_post_archiver::web;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    init_tracing()?;

    info!("Starting channel-post-archiver");

    // Load and validate configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(channel_id = config.channel_id, "Configuration loaded");

    // Select the storage backend once, at composition time.
    let storage: Arc<dyn Storage> = match config.storage_backend {
        StorageBackend::Sqlite => {
            if let Some(parent) = config.database_path.parent() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }

            let db = Database::new(&config.database_path)
                .await
                .context("Failed to initialize database")?;

            info!("Database initialized");
            Arc::new(SqliteStorage::new(db))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; the archive will not survive a restart");
            Arc::new(MemoryStorage::new())
        }
    };

    let query = QueryService::new(Arc::clone(&storage));
    let shutdown = CancellationToken::new();

    // Inbound stream: the platform client feeds descriptors into this
    // channel. The default transport reads NDJSON from stdin.
    let (tx, rx) = mpsc::channel(config.ingest_queue_size);

    let consumer = IngestConsumer::new(storage, config.channel_id, config.upsert_timeout);
    let consumer_handle = tokio::spawn(consumer.run(rx, shutdown.clone()));

    let feeder_handle = tokio::spawn(ingest::feed_from_stdin(tx, shutdown.clone()));

    // Start web server in background
    let web_config = config.clone();
    let web_shutdown = shutdown.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(&web_config, query, web_shutdown).await {
            error!("Web server error: {e:#}");
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down...");

    // Signal everything to stop. The consumer finishes any upsert already in
    // flight; the web server drains in-flight requests.
    shutdown.cancel();

    let _ = feeder_handle.await;
    let _ = consumer_handle.await;
    let _ = web_handle.await;

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,channel_post_archiver=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
