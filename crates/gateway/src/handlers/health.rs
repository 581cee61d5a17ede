//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: ReadyChecks,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub index: IndexCheck,
    pub conversation_turns: usize,
}

#[derive(Serialize)]
pub struct IndexCheck {
    pub passages: usize,
    pub dimension: usize,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe
///
/// The index is loaded before the listener binds, so a running server is
/// ready. An empty index is reported, not treated as a failure.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ready".to_string(),
        checks: ReadyChecks {
            index: IndexCheck {
                passages: state.index.len(),
                dimension: state.index.dimension(),
            },
            conversation_turns: state.pipeline.conversation().len().await,
        },
    })
}
