//! HTTP surface of the FAQ backend.
//!
//! `/health`, `/status` and `/metrics` are plain GET endpoints; `/rag/answer`
//! and `/rag/search` accept JSON and are open to any origin. Every response
//! goes through [`middleware_layer::request_context::request_context`], which
//! assigns the request id, times the call and counts errors.

pub mod core;
pub mod error_handler;
pub mod middleware_layer;
mod routes;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::core::app_state::AppState;
use crate::error_handler::AppError;
use crate::middleware_layer::request_context::request_context;
use crate::routes::{
    health_route::health,
    metrics_route::metrics,
    rag::{answer_route::rag_answer, search_route::rag_search},
    status_route::status,
};

/// Builds the full router with state and middleware applied.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let rag = Router::new()
        .route("/rag/answer", post(rag_answer))
        .route("/rag/search", post(rag_search))
        .layer(cors);

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .merge(rag)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), request_context))
        .with_state(state)
}

/// Binds `address` and serves until Ctrl+C.
pub async fn start(state: Arc<AppState>, address: &str) -> Result<(), AppError> {
    let listener = TcpListener::bind(address).await.map_err(AppError::Bind)?;
    info!(%address, "HTTP API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("HTTP API stopped");
    Ok(())
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Resolves on Ctrl+C. If the signal cannot be installed the server keeps running.
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
