//! HTTP API.
//!
//! # Endpoints
//!
//! - `GET /` - health check page
//! - `GET /result[?recruiterId=|?recruiter_email=]` - per-job summaries
//! - `GET /candidate_results?email=` - all results for one candidate

pub mod error;
pub mod handlers;

use crate::aggregation::ResultsAggregator;
use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared handler state. Cloned per request; the stores behind it are not.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<ResultsAggregator>,
}

/// Build the router.
pub fn router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        .route("/", get(handlers::index))
        .route("/result", get(handlers::get_results))
        .route("/candidate_results", get(handlers::get_candidate_results))
        .with_state(state);

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Serve until Ctrl-C.
pub async fn serve(app: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
