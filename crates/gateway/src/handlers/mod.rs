//! API handlers module

pub mod contexts;
pub mod health;
pub mod messages;
pub mod query;

use ragchat_common::errors::AppError;
use validator::{ValidationError, ValidationErrors};

/// Limits request bodies are validated against
pub struct QueryLimits {
    pub max_query_chars: usize,
}

/// Length in characters, so multi-byte scripts get the same limit
pub(crate) fn validate_query_length(query: &str, limits: &QueryLimits) -> Result<(), ValidationError> {
    let chars = query.chars().count();
    if chars > limits.max_query_chars {
        let mut err = ValidationError::new("length");
        err.message = Some(format!("query is {} characters, limit is {}", chars, limits.max_query_chars).into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validation_failed(errors: ValidationErrors) -> AppError {
    AppError::Validation {
        message: errors.to_string(),
        field: errors.field_errors().keys().next().map(|field| field.to_string()),
    }
}
