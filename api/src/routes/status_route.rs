use std::sync::Arc;

use axum::{Json, extract::State};
use contextor::DependencyHealth;
use serde::Serialize;

use crate::core::{app_state::AppState, stats::StatusSnapshot};

#[derive(Debug, Serialize)]
pub struct StatusBody {
    #[serde(flatten)]
    pub counters: StatusSnapshot,
    /// `false` when any dependency probe failed.
    pub ready: bool,
    pub dependencies: Vec<DependencyHealth>,
}

/// Handler: GET /status
///
/// Counters plus live probes of Qdrant and every configured model.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusBody> {
    let dependencies = state.orchestrator.health().await;
    Json(StatusBody {
        counters: state.stats.snapshot(state.orchestrator.default_provider()),
        ready: dependencies.iter().all(|d| d.ok),
        dependencies,
    })
}
