//! Error types for RagChat services
//!
//! Provides:
//! - Distinct error types for each collaborator failure mode
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling
//!
//! Empty queries and empty candidate sets are not errors anywhere in the
//! pipeline; they flow through as empty structures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Upstream collaborator errors (8xxx)
    RetrievalUnavailable,
    EmbeddingError,
    RerankUnavailable,
    GenerationUnavailable,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::RetrievalUnavailable => 8002,
            ErrorCode::EmbeddingError => 8003,
            ErrorCode::RerankUnavailable => 8004,
            ErrorCode::GenerationUnavailable => 8005,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Collaborator errors
    #[error("Retrieval unavailable: {message}")]
    RetrievalUnavailable { message: String },

    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Rerank unavailable: {message}")]
    RerankUnavailable { message: String },

    #[error("Generation unavailable: {message}")]
    GenerationUnavailable { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::RetrievalUnavailable { .. } => ErrorCode::RetrievalUnavailable,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::RerankUnavailable { .. } => ErrorCode::RerankUnavailable,
            AppError::GenerationUnavailable { .. } => ErrorCode::GenerationUnavailable,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            AppError::Internal { .. } | AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::RetrievalUnavailable { .. }
            | AppError::EmbeddingError { .. }
            | AppError::RerankUnavailable { .. }
            | AppError::GenerationUnavailable { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Name of the collaborator that produced this error, if any
    pub fn collaborator(&self) -> Option<&'static str> {
        match self {
            AppError::RetrievalUnavailable { .. } => Some("retrieval"),
            AppError::EmbeddingError { .. } => Some("embedding"),
            AppError::RerankUnavailable { .. } => Some("rerank"),
            AppError::GenerationUnavailable { .. } => Some("generation"),
            _ => None,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = code.as_code(),
                collaborator = self.collaborator().unwrap_or("none"),
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = code.as_code(),
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_errors_are_bad_gateway() {
        let errors = [
            AppError::RetrievalUnavailable { message: "index".into() },
            AppError::RerankUnavailable { message: "quota".into() },
            AppError::GenerationUnavailable { message: "empty".into() },
            AppError::EmbeddingError { message: "timeout".into() },
        ];

        for err in errors {
            assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
            assert!(err.is_server_error());
            assert!(err.collaborator().is_some());
        }
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "query too long".into(),
            field: Some("query".into()),
        };
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
        assert_eq!(err.collaborator(), None);
    }

    #[test]
    fn test_internal_errors_are_server_errors() {
        let errors = [
            AppError::Internal { message: "client build".into() },
            AppError::Configuration { message: "rerank.api_key".into() },
        ];

        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(err.code().as_code() / 1000, 9);
            assert_eq!(err.collaborator(), None);
        }
    }

    #[test]
    fn test_error_code_numbers() {
        assert_eq!(ErrorCode::RerankUnavailable.as_code(), 8004);
        assert_eq!(ErrorCode::ConfigurationError.as_code(), 9002);
    }

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse {
            error: ErrorDetails {
                code: ErrorCode::GenerationUnavailable,
                message: "Generation unavailable: empty".into(),
                field: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "GENERATION_UNAVAILABLE");
        assert!(json["error"].get("field").is_none());
    }
}
