//! Question answering handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::{Validate, ValidateArgs};

use super::{validate_query_length, validation_failed, QueryLimits};
use crate::AppState;
use ragchat_common::errors::Result;

#[derive(Debug, Deserialize, Validate)]
#[validate(context = QueryLimits)]
pub struct QueryRequest {
    #[validate(custom(function = "validate_query_length", use_context))]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
}

/// Answer a question grounded in the indexed corpus
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();

    request
        .validate_with_args(&QueryLimits {
            max_query_chars: state.config.server.max_query_chars,
        })
        .map_err(validation_failed)?;

    let answer = state.pipeline.answer(&request.query).await?;

    tracing::info!(
        query_chars = request.query.chars().count(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Query answered"
    );

    Ok(Json(QueryResponse {
        query: request.query,
        answer,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_limit_comes_from_context() {
        let request = QueryRequest {
            query: "ক".repeat(10),
        };
        assert!(request
            .validate_with_args(&QueryLimits { max_query_chars: 10 })
            .is_ok());

        let errors = request
            .validate_with_args(&QueryLimits { max_query_chars: 9 })
            .unwrap_err();
        assert!(errors.field_errors().contains_key("query"));
    }
}
