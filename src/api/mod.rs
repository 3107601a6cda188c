//! HTTP surface.
//!
//! Route definitions and server startup; handler implementations live in
//! their submodules. Handlers run on the runtime's per-request model and
//! only ever touch the service layer.

mod cache;
mod error;
mod search;

pub use error::ApiError;

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::reindex::Reindexer;
use crate::service::SearchService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    pub reindexer: Arc<Reindexer>,
    pub reindex_deadline: Duration,
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search", get(search::query))
        .route("/search/stats", get(search::stats))
        .route("/search/reindex", post(search::reindex))
        .route("/search/{id}", get(search::get_by_id))
        .route("/cache/stats", get(cache::stats))
        .route("/cache/get", get(cache::get_value))
        .route("/cache/invalidate", post(cache::invalidate))
        .with_state(state)
        .layer(cors)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Serve the API until the shutdown signal flips.
pub async fn serve(
    state: AppState,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{port}");
    info!("Search API listening on {}", &bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
}
