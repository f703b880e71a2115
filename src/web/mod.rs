mod routes;

pub use routes::router;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::query::QueryService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
}

/// Start the web server, shutting down gracefully when the token fires.
///
/// In-flight requests are allowed to complete after shutdown is signalled.
///
/// # Errors
///
/// Returns an error if the server fails to bind or serve.
pub async fn serve(
    config: &Config,
    query: QueryService,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let state = AppState { query };

    // CORS is permissive: the query surface is read-only and public.
    let app = router()
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!(addr = %addr, "Starting web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Web server error")?;

    Ok(())
}
