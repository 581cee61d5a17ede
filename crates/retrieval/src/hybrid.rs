//! Hybrid retrieval: dense fan-out followed by a local lexical re-score
//!
//! The dense similarity only decides which passages enter the candidate
//! set. Ordering comes from the BM25 score computed over that set.

use super::{bm25::LexicalScorer, tokenizer::tokenize, Candidate, DenseRetriever, RankedList};
use ragchat_common::errors::Result;
use ragchat_common::metrics;
use std::sync::Arc;
use std::time::Instant;

/// Hybrid retriever combining a dense retriever with lexical scoring
pub struct HybridRetriever {
    dense: Arc<dyn DenseRetriever>,
    scorer: LexicalScorer,
    default_k: usize,
}

impl HybridRetriever {
    /// Create a new hybrid retriever with default BM25 parameters
    pub fn new(dense: Arc<dyn DenseRetriever>, default_k: usize) -> Self {
        Self {
            dense,
            scorer: LexicalScorer::default(),
            default_k,
        }
    }

    /// Create with a custom lexical scorer
    pub fn with_scorer(dense: Arc<dyn DenseRetriever>, default_k: usize, scorer: LexicalScorer) -> Self {
        Self {
            dense,
            scorer,
            default_k,
        }
    }

    /// Fan-out used when the caller does not pass one
    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Number of passages behind the dense retriever
    pub fn corpus_size(&self) -> usize {
        self.dense.len()
    }

    /// Retrieve with the configured fan-out
    pub async fn retrieve_default(&self, query: &str) -> Result<RankedList> {
        self.retrieve(query, self.default_k).await
    }

    /// Retrieve up to `k` candidates ordered by local lexical score
    ///
    /// Duplicate passages from the dense retriever are kept. An empty
    /// query or an empty dense result yields an empty list.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RankedList> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();

        let mut passages = self.dense.search(query, k).await?;
        passages.truncate(k);

        let query_terms = tokenize(query);
        let candidate_terms: Vec<Vec<String>> = passages.iter().map(|p| tokenize(&p.text)).collect();
        let scores = self.scorer.score(&query_terms, &candidate_terms);

        let mut ranked: RankedList = passages
            .into_iter()
            .zip(scores)
            .map(|(passage, score)| Candidate {
                text: passage.text,
                score,
            })
            .collect();

        // sort_by is stable: equal scores keep dense retrieval order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        let elapsed = start.elapsed();
        metrics::record_retrieval(elapsed.as_secs_f64(), ranked.len());
        tracing::debug!(
            k,
            candidates = ranked.len(),
            query_terms = query_terms.len(),
            latency_ms = elapsed.as_millis() as u64,
            "Hybrid retrieval completed"
        );

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScoredPassage;
    use ragchat_common::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::assert_err;

    /// Returns a fixed passage list, ignoring the query
    struct FixedRetriever {
        passages: Vec<String>,
        calls: AtomicUsize,
    }

    impl FixedRetriever {
        fn new(passages: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                passages: passages.iter().map(|p| p.to_string()).collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl DenseRetriever for FixedRetriever {
        async fn search(&self, _query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .passages
                .iter()
                .take(k)
                .enumerate()
                .map(|(i, text)| ScoredPassage {
                    text: text.clone(),
                    similarity: 1.0 - i as f32 * 0.01,
                })
                .collect())
        }

        fn len(&self) -> usize {
            self.passages.len()
        }
    }

    /// Ignores `k` and returns everything it holds
    struct GreedyRetriever(Vec<String>);

    #[async_trait::async_trait]
    impl DenseRetriever for GreedyRetriever {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredPassage>> {
            Ok(self
                .0
                .iter()
                .map(|text| ScoredPassage {
                    text: text.clone(),
                    similarity: 0.5,
                })
                .collect())
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    struct FailingRetriever;

    #[async_trait::async_trait]
    impl DenseRetriever for FailingRetriever {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredPassage>> {
            Err(AppError::RetrievalUnavailable {
                message: "index offline".into(),
            })
        }

        fn len(&self) -> usize {
            0
        }
    }

    fn assert_sorted(list: &RankedList) {
        for pair in list.windows(2) {
            assert!(pair[0].score >= pair[1].score, "not sorted: {:?}", list);
        }
    }

    #[tokio::test]
    async fn test_empty_dense_results() {
        let retriever = HybridRetriever::new(FixedRetriever::new(&[]), 10);
        let ranked = retriever.retrieve("capital of France", 10).await.unwrap();
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_skips_dense_call() {
        let dense = FixedRetriever::new(&["Paris is the capital of France."]);
        let retriever = HybridRetriever::new(dense.clone(), 10);

        assert!(retriever.retrieve("", 10).await.unwrap().is_empty());
        assert!(retriever.retrieve("   ", 10).await.unwrap().is_empty());
        assert_eq!(dense.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lexical_score_decides_order() {
        // Dense order puts Berlin first; lexical score must win
        let retriever = HybridRetriever::new(
            FixedRetriever::new(&["Berlin is a city.", "Paris is the capital of France."]),
            10,
        );
        let ranked = retriever.retrieve("capital of France", 10).await.unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].text, "Paris is the capital of France.");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[tokio::test]
    async fn test_stable_on_equal_scores() {
        let passages = [
            "alpha unrelated",
            "beta match",
            "gamma unrelated",
            "delta match",
            "epsilon unrelated",
        ];
        let retriever = HybridRetriever::new(FixedRetriever::new(&passages), 10);
        let ranked = retriever.retrieve("match", 10).await.unwrap();
        assert_sorted(&ranked);

        let texts: Vec<&str> = ranked.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["beta match", "delta match", "alpha unrelated", "gamma unrelated", "epsilon unrelated"]
        );
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let retriever = HybridRetriever::new(
            FixedRetriever::new(&["same passage", "same passage", "other"]),
            10,
        );
        let ranked = retriever.retrieve("passage", 10).await.unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].text, "same passage");
        assert_eq!(ranked[1].text, "same passage");
    }

    #[tokio::test]
    async fn test_length_bounded_by_k() {
        let passages: Vec<String> = (0..25).map(|i| format!("passage number {}", i)).collect();
        let refs: Vec<&str> = passages.iter().map(String::as_str).collect();

        let retriever = HybridRetriever::new(FixedRetriever::new(&refs), 10);
        assert_eq!(retriever.retrieve_default("passage").await.unwrap().len(), 10);
        assert_eq!(retriever.retrieve("passage", 3).await.unwrap().len(), 3);
        assert!(retriever.retrieve("passage", 0).await.unwrap().is_empty());

        let greedy = HybridRetriever::new(Arc::new(GreedyRetriever(passages.clone())), 10);
        assert_eq!(greedy.retrieve("passage", 4).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_dense_failure_propagates() {
        let retriever = HybridRetriever::new(Arc::new(FailingRetriever), 10);
        let err = assert_err!(retriever.retrieve("anything", 10).await);
        assert!(matches!(err, AppError::RetrievalUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_scores_non_negative() {
        let retriever = HybridRetriever::new(
            FixedRetriever::new(&["the the the", "the cat", "cat", ""]),
            10,
        );
        let ranked = retriever.retrieve("the cat", 10).await.unwrap();
        assert_sorted(&ranked);
        assert!(ranked.iter().all(|c| c.score.is_finite() && c.score >= 0.0));
    }
}
