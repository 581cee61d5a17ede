//! BM25 lexical scoring over a local candidate set
//!
//! Collection statistics (document frequency, average length) come from the
//! candidates of the current retrieval call only. The resulting scores are
//! meaningful for ordering within that set, not as absolute relevance.

use std::collections::HashMap;

/// Okapi BM25 scorer with a non-negative IDF
#[derive(Debug, Clone)]
pub struct LexicalScorer {
    /// Term-frequency saturation
    pub k1: f64,

    /// Length normalization strength (0.0 - 1.0)
    pub b: f64,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl LexicalScorer {
    /// Create with custom parameters
    pub fn with_params(k1: f64, b: f64) -> Self {
        Self { k1, b }
    }

    /// Score every candidate against the query, one score per candidate
    ///
    /// Always returns finite, non-negative values. Query terms that repeat
    /// contribute once per occurrence.
    pub fn score(&self, query_terms: &[String], candidates: &[Vec<String>]) -> Vec<f64> {
        let n = candidates.len();
        if n == 0 {
            return Vec::new();
        }

        let total_len: usize = candidates.iter().map(Vec::len).sum();
        let avg_len = total_len as f64 / n as f64;
        if avg_len <= 0.0 || query_terms.is_empty() {
            return vec![0.0; n];
        }

        let term_counts: Vec<HashMap<&str, usize>> = candidates
            .iter()
            .map(|terms| {
                let mut counts = HashMap::new();
                for term in terms {
                    *counts.entry(term.as_str()).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut idf: HashMap<&str, f64> = HashMap::new();
        for term in query_terms {
            idf.entry(term.as_str()).or_insert_with(|| {
                let df = term_counts
                    .iter()
                    .filter(|counts| counts.contains_key(term.as_str()))
                    .count();
                self.idf(n, df)
            });
        }

        candidates
            .iter()
            .zip(&term_counts)
            .map(|(terms, counts)| {
                let doc_len = terms.len() as f64;
                let norm = self.k1 * (1.0 - self.b + self.b * doc_len / avg_len);

                query_terms
                    .iter()
                    .map(|term| {
                        let tf = counts.get(term.as_str()).copied().unwrap_or(0) as f64;
                        if tf == 0.0 {
                            return 0.0;
                        }
                        let weight = idf.get(term.as_str()).copied().unwrap_or(0.0);
                        finite_or_zero(weight * tf * (self.k1 + 1.0) / (tf + norm))
                    })
                    .sum::<f64>()
            })
            .map(finite_or_zero)
            .collect()
    }

    /// `ln(1 + (N - df + 0.5) / (df + 0.5))`, which stays positive even for
    /// terms present in every candidate
    fn idf(&self, n: usize, df: usize) -> f64 {
        let n = n as f64;
        let df = df as f64;
        finite_or_zero((1.0 + (n - df + 0.5) / (df + 0.5)).ln())
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn docs(texts: &[&str]) -> Vec<Vec<String>> {
        texts.iter().map(|t| tokenize(t)).collect()
    }

    #[test]
    fn test_empty_candidates() {
        let scorer = LexicalScorer::default();
        assert!(scorer.score(&tokenize("anything"), &[]).is_empty());
    }

    #[test]
    fn test_single_candidate_is_finite() {
        let scorer = LexicalScorer::default();
        let scores = scorer.score(&tokenize("capital"), &docs(&["Paris is the capital."]));
        assert_eq!(scores.len(), 1);
        assert!(scores[0].is_finite());
        assert!(scores[0] >= 0.0);
    }

    #[test]
    fn test_capital_of_france_ranks_paris_first() {
        let scorer = LexicalScorer::default();
        let scores = scorer.score(
            &tokenize("capital of France"),
            &docs(&["Paris is the capital of France.", "Berlin is a city."]),
        );
        assert_eq!(scores.len(), 2);
        assert!(scores[0] > scores[1], "scores: {:?}", scores);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        let scorer = LexicalScorer::default();
        let scores = scorer.score(&[], &docs(&["one", "two"]));
        assert_eq!(scores, vec![0.0, 0.0]);
    }

    #[test]
    fn test_all_empty_documents() {
        let scorer = LexicalScorer::default();
        let scores = scorer.score(&tokenize("query"), &docs(&["", "!!!"]));
        assert_eq!(scores, vec![0.0, 0.0]);
    }

    #[test]
    fn test_scores_non_negative_and_finite() {
        let scorer = LexicalScorer::default();
        let candidates = docs(&[
            "the the the the",
            "the cat sat on the mat",
            "",
            "cat",
            "a completely unrelated passage about rivers",
        ]);
        for query in ["the", "cat the", "mat mat mat", "", "rivers of the cat"] {
            for score in scorer.score(&tokenize(query), &candidates) {
                assert!(score.is_finite());
                assert!(score >= 0.0);
            }
        }
    }

    #[test]
    fn test_rarer_term_weighs_more() {
        let scorer = LexicalScorer::default();
        let candidates = docs(&["river bank", "river flow", "river bank loan", "money"]);
        let scores = scorer.score(&tokenize("river loan"), &candidates);
        // "loan" appears once across the set, "river" three times
        assert!(scores[2] > scores[0]);
        assert!(scores[0] > scores[3]);
    }

    #[test]
    fn test_repeated_query_terms_accumulate() {
        let scorer = LexicalScorer::default();
        let candidates = docs(&["paris france", "berlin germany"]);
        let once = scorer.score(&tokenize("paris"), &candidates);
        let twice = scorer.score(&tokenize("paris paris"), &candidates);
        assert!((twice[0] - 2.0 * once[0]).abs() < 1e-9);
    }

    #[test]
    fn test_custom_params() {
        let scorer = LexicalScorer::with_params(1.2, 0.0);
        let scores = scorer.score(&tokenize("a"), &docs(&["a b c d e f", "a"]));
        // Without length normalization both candidates score the same
        assert!((scores[0] - scores[1]).abs() < 1e-12);
    }
}
