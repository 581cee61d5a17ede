//! Retrieval diagnostics handlers
//!
//! Expose the hybrid candidate list for a query, before reranking. These
//! calls never touch the conversation.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateArgs};

use super::{validate_query_length, validation_failed, QueryLimits};
use crate::AppState;
use ragchat_common::errors::Result;

#[derive(Debug, Deserialize, Validate)]
#[validate(context = QueryLimits)]
pub struct ContextsRequest {
    #[validate(custom(function = "validate_query_length", use_context))]
    pub query: String,

    /// Dense fan-out; the configured default when absent
    #[validate(range(min = 1, max = 100))]
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ContextItem {
    pub context: String,
    pub score: f64,
}

/// `GET /relevant-contexts?query=...&k=...`
pub async fn get_contexts(
    State(state): State<AppState>,
    Query(request): Query<ContextsRequest>,
) -> Result<Json<Vec<ContextItem>>> {
    relevant_contexts(&state, request).await
}

/// `POST /relevant-contexts` with a JSON body
pub async fn post_contexts(
    State(state): State<AppState>,
    Json(request): Json<ContextsRequest>,
) -> Result<Json<Vec<ContextItem>>> {
    relevant_contexts(&state, request).await
}

async fn relevant_contexts(state: &AppState, request: ContextsRequest) -> Result<Json<Vec<ContextItem>>> {
    request
        .validate_with_args(&QueryLimits {
            max_query_chars: state.config.server.max_query_chars,
        })
        .map_err(validation_failed)?;

    let ranked = state.pipeline.relevant_contexts(&request.query, request.k).await?;

    tracing::debug!(results = ranked.len(), k = ?request.k, "Relevant contexts served");

    Ok(Json(
        ranked
            .into_iter()
            .map(|candidate| ContextItem {
                context: candidate.text,
                score: candidate.score,
            })
            .collect(),
    ))
}
