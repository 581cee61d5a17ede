//! Second-pass reranking through an external cross-encoder service
//!
//! Only the head of the hybrid list (the fan-out, 10 by default) is sent
//! to the reranker, which keeps rerank cost independent of the dense
//! fan-out. Failures surface as `RerankUnavailable`; there is no local
//! fallback ordering.

use super::RankedList;
use ragchat_common::config::RerankConfig;
use ragchat_common::errors::{AppError, Result};
use ragchat_common::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A passage placed by the reranker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedPassage {
    /// Position of the passage in the submitted document list
    pub index: usize,

    /// Passage content
    pub text: String,

    /// Reranker relevance score
    pub relevance_score: f64,
}

/// Cross-encoder style reranker
#[async_trait::async_trait]
pub trait Reranker: Send + Sync {
    /// Return at most `top_n` of `documents`, most relevant first
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize) -> Result<Vec<RerankedPassage>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Passage payload of a rerank result item
///
/// Services return either the bare string or an object wrapping it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RerankDocument {
    Plain(String),
    Nested { text: String },
}

impl RerankDocument {
    pub fn into_text(self) -> String {
        match self {
            RerankDocument::Plain(text) | RerankDocument::Nested { text } => text,
        }
    }
}

/// One entry of a rerank service response
#[derive(Debug, Clone, Deserialize)]
pub struct RerankResultItem {
    pub index: usize,
    pub relevance_score: f64,
    #[serde(default)]
    pub document: Option<RerankDocument>,
}

impl RerankResultItem {
    /// Resolve the passage text, falling back to the submitted document
    pub fn into_passage(self, documents: &[String]) -> Result<RerankedPassage> {
        let text = match self.document {
            Some(document) => document.into_text(),
            None => documents
                .get(self.index)
                .cloned()
                .ok_or_else(|| AppError::RerankUnavailable {
                    message: format!(
                        "result index {} out of range for {} documents",
                        self.index,
                        documents.len()
                    ),
                })?,
        };

        Ok(RerankedPassage {
            index: self.index,
            text,
            relevance_score: self.relevance_score,
        })
    }
}

/// Convert raw result items into an ordered, bounded passage list
pub fn extract_passages(
    items: Vec<RerankResultItem>,
    documents: &[String],
    top_n: usize,
) -> Result<Vec<RerankedPassage>> {
    let mut passages = items
        .into_iter()
        .map(|item| item.into_passage(documents))
        .collect::<Result<Vec<_>>>()?;

    passages.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    passages.truncate(top_n.min(documents.len()));
    Ok(passages)
}

/// Cohere `/v1/rerank` client
pub struct CohereReranker {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct CohereRerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
    return_documents: bool,
}

#[derive(Deserialize)]
struct CohereRerankResponse {
    results: Vec<RerankResultItem>,
}

impl CohereReranker {
    pub fn new(config: &RerankConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "rerank.api_key is required for the cohere provider".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

fn unavailable(message: String) -> AppError {
    AppError::RerankUnavailable { message }
}

#[async_trait::async_trait]
impl Reranker for CohereReranker {
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize) -> Result<Vec<RerankedPassage>> {
        let top_n = top_n.min(documents.len());
        if top_n == 0 {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.base_url);
        let request = CohereRerankRequest {
            model: &self.model,
            query,
            documents,
            top_n,
            return_documents: true,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| unavailable(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("API error {}: {}", status, body)));
        }

        let parsed: CohereRerankResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Failed to parse response: {}", e)))?;

        extract_passages(parsed.results, documents, top_n)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Keeps the submitted order, scoring by position
pub struct MockReranker;

#[async_trait::async_trait]
impl Reranker for MockReranker {
    async fn rerank(&self, _query: &str, documents: &[String], top_n: usize) -> Result<Vec<RerankedPassage>> {
        Ok(documents
            .iter()
            .take(top_n)
            .enumerate()
            .map(|(index, text)| RerankedPassage {
                index,
                text: text.clone(),
                relevance_score: 1.0 / (index as f64 + 1.0),
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "mock-reranker"
    }
}

/// Create a reranker based on configuration
pub fn create_reranker(config: &RerankConfig) -> Result<Arc<dyn Reranker>> {
    match config.provider.as_str() {
        "cohere" => Ok(Arc::new(CohereReranker::new(config)?)),
        "mock" => Ok(Arc::new(MockReranker)),
        other => Err(AppError::Configuration {
            message: format!("unknown rerank provider '{}'", other),
        }),
    }
}

/// Rerank the head of a hybrid list
///
/// Sends the first `min(fan_out, ranked.len())` texts and keeps at most
/// `top_n` results. An empty list never reaches the service.
pub async fn rerank_candidates(
    reranker: &dyn Reranker,
    query: &str,
    ranked: &RankedList,
    fan_out: usize,
    top_n: usize,
) -> Result<Vec<RerankedPassage>> {
    let documents: Vec<String> = ranked.iter().take(fan_out).map(|c| c.text.clone()).collect();
    let top_n = top_n.min(documents.len());
    if top_n == 0 {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let result = reranker.rerank(query, &documents, top_n).await;
    metrics::record_rerank(start.elapsed().as_secs_f64(), reranker.model_name(), result.is_ok());

    let mut passages = result?;
    passages.truncate(top_n);

    tracing::debug!(
        submitted = documents.len(),
        kept = passages.len(),
        model = reranker.model_name(),
        "Rerank completed"
    );
    Ok(passages)
}
