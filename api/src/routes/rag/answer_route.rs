//! POST /rag/answer: retrieve contexts and ask the LLM for a grounded answer.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use contextor::AnswerRequest;
use tracing::debug;

use crate::{
    core::app_state::AppState,
    error_handler::AppResult,
    middleware_layer::request_context::RequestId,
    routes::rag::rag_request::{
        AnswerBody, AnswerResponse, context_views, parse_k, parse_provider,
    },
};

/// Handler: POST /rag/answer
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/rag/answer \
///   -H 'content-type: application/json' \
///   -d '{"query":"How do refunds work?","k":4,"include_text":true}'
/// ```
pub async fn rag_answer(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: Result<Json<AnswerBody>, JsonRejection>,
) -> AppResult<Json<AnswerResponse>> {
    let Json(body) = body?;
    let k = parse_k(body.k)?;
    let provider = parse_provider(body.provider.as_deref())?;

    let answer = state
        .orchestrator
        .answer(AnswerRequest {
            query: body.query,
            k,
            provider,
            request_id: Some(request_id),
        })
        .await?;

    debug!(
        contexts = answer.contexts.len(),
        grounded = answer.meta.grounded,
        "rag_answer: success"
    );

    Ok(Json(AnswerResponse {
        answer: answer.answer,
        contexts: context_views(answer.contexts, body.include_text),
        meta: answer.meta,
    }))
}
