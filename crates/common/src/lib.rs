//! RagChat Common Library
//!
//! Shared code for the RagChat services including:
//! - Configuration management
//! - Error types and handling
//! - Metrics and observability
//! - Embedding client abstraction
//! - Generative model client abstraction

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod generation;
pub mod metrics;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use generation::Generator;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Default dense-retrieval fan-out
pub const DEFAULT_RETRIEVAL_K: usize = 10;

/// Default number of hybrid candidates handed to the reranker
pub const DEFAULT_RERANK_FAN_OUT: usize = 10;

/// Default number of reranked passages kept as grounding context
pub const DEFAULT_RERANK_TOP_N: usize = 3;
