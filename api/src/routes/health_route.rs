use axum::Json;
use serde_json::{Value, json};

/// Handler: GET /health
///
/// Liveness only; does not touch Qdrant or the LLM.
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}
