use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::context_view::ContextView},
    error_handler::AppResult,
    routes::rag::rag_request::{SearchBody, context_views, parse_k},
};

/// Handler: POST /rag/search
///
/// Retrieval only; returns a JSON array of contexts, highest score first.
pub async fn rag_search(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> AppResult<Json<Vec<ContextView>>> {
    let Json(body) = body?;
    let k = parse_k(body.k)?;

    let contexts = state.orchestrator.search(&body.query, k).await?;
    debug!(hits = contexts.len(), "rag_search: success");

    Ok(Json(context_views(contexts, body.include_text)))
}
