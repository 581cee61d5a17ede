//! Retrieval core for grounded question answering
//!
//! Provides:
//! - Tokenization shared by the query and every candidate
//! - Local BM25 scoring over a small candidate set
//! - Dense retrieval from a pre-built vector index
//! - Hybrid retrieval (dense fan-out, lexical re-score)
//! - Reranking through an external cross-encoder service
//! - Grounding context assembly

pub mod bm25;
pub mod context;
pub mod hybrid;
pub mod rerank;
pub mod tokenizer;
pub mod vector;

pub use bm25::LexicalScorer;
pub use context::assemble;
pub use hybrid::HybridRetriever;
pub use rerank::{create_reranker, RerankedPassage, Reranker};
pub use tokenizer::tokenize;
pub use vector::{FlatIndexRetriever, VectorIndex};

use ragchat_common::errors::Result;
use serde::{Deserialize, Serialize};

/// A passage with a stage-local relevance score
///
/// Scores from different stages (dense similarity, lexical, reranker) are
/// not comparable with each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Passage content
    pub text: String,

    /// Relevance score on the producing stage's scale
    pub score: f64,
}

/// Candidates sorted descending by score, ties in retrieval order
pub type RankedList = Vec<Candidate>;

/// Dense retriever output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// Passage content
    pub text: String,

    /// Cosine similarity to the query embedding
    pub similarity: f32,
}

/// Nearest-neighbour search over a pre-built vector index
#[async_trait::async_trait]
pub trait DenseRetriever: Send + Sync {
    /// Return at most `k` passages, most similar first
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>>;

    /// Number of passages in the underlying index
    fn len(&self) -> usize;

    /// Whether the underlying index holds no passages
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
