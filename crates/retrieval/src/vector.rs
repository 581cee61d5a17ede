//! Dense retrieval over a pre-built vector index
//!
//! The index is a JSON document produced offline:
//!
//! ```json
//! { "dimension": 384, "passages": [ { "text": "...", "embedding": [0.1, ...] } ] }
//! ```
//!
//! It is loaded once at startup and never mutated afterwards.

use super::{DenseRetriever, ScoredPassage};
use ragchat_common::embeddings::Embedder;
use ragchat_common::errors::{AppError, Result};
use ragchat_common::metrics;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Failures while loading the vector index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to read index {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse index: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("index dimension must be at least 1")]
    ZeroDimension,

    #[error("passage {position} has {actual} dimensions, index declares {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        AppError::RetrievalUnavailable {
            message: err.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct IndexFile {
    dimension: usize,
    passages: Vec<IndexFilePassage>,
}

#[derive(Deserialize)]
struct IndexFilePassage {
    text: String,
    embedding: Vec<f32>,
}

/// One indexed passage with its precomputed vector norm
#[derive(Debug, Clone)]
struct IndexedPassage {
    text: String,
    embedding: Vec<f32>,
    norm: f32,
}

/// Read-only flat index searched by cosine similarity
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    passages: Vec<IndexedPassage>,
}

impl VectorIndex {
    /// Load the index from a JSON file
    pub fn load(path: &Path) -> std::result::Result<Self, IndexError> {
        let raw = std::fs::read_to_string(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse the index from its JSON representation
    pub fn from_json(raw: &str) -> std::result::Result<Self, IndexError> {
        let file: IndexFile = serde_json::from_str(raw)?;
        Self::from_entries(
            file.dimension,
            file.passages.into_iter().map(|p| (p.text, p.embedding)),
        )
    }

    /// Build an index from in-memory `(text, embedding)` pairs
    pub fn from_entries<I>(dimension: usize, entries: I) -> std::result::Result<Self, IndexError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }

        let mut passages = Vec::new();
        for (position, (text, embedding)) in entries.into_iter().enumerate() {
            if embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            let norm = l2_norm(&embedding);
            passages.push(IndexedPassage { text, embedding, norm });
        }

        Ok(Self { dimension, passages })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Top-`k` passages by cosine similarity, ties in index order
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<ScoredPassage> {
        let query_norm = l2_norm(query);

        let mut scored: Vec<ScoredPassage> = self
            .passages
            .iter()
            .map(|p| ScoredPassage {
                text: p.text.clone(),
                similarity: cosine(query, query_norm, &p.embedding, p.norm),
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k);
        scored
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let sim = dot / (a_norm * b_norm);
    if sim.is_finite() {
        sim
    } else {
        0.0
    }
}

/// Dense retriever that embeds the query and searches a flat index
pub struct FlatIndexRetriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl FlatIndexRetriever {
    /// Pair an index with the embedder that produced it
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if embedder.dimension() != index.dimension() {
            return Err(AppError::RetrievalUnavailable {
                message: format!(
                    "embedder {} produces {} dimensions, index has {}",
                    embedder.model_name(),
                    embedder.dimension(),
                    index.dimension()
                ),
            });
        }
        Ok(Self { index, embedder })
    }
}

#[async_trait::async_trait]
impl DenseRetriever for FlatIndexRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        // Embedder clients count their own failures
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| AppError::RetrievalUnavailable {
                message: format!("query embedding failed: {}", e),
            })?;

        if embedding.len() != self.index.dimension() {
            metrics::record_collaborator_error("retrieval");
            return Err(AppError::RetrievalUnavailable {
                message: format!(
                    "query embedding has {} dimensions, index has {}",
                    embedding.len(),
                    self.index.dimension()
                ),
            });
        }

        let results = self.index.nearest(&embedding, k);
        tracing::debug!(k, returned = results.len(), "Dense search completed");
        Ok(results)
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}
