//! BM25 scoring algorithm.
//!
//! Okapi BM25 with a per-query-term weight:
//!
//! ```text
//! score(D, Q) = Σ w_i * IDF(q_i) * (f(q_i, D) * (k1 + 1)) / (f(q_i, D) + k1 * (1 - b + b * |D| / avgdl))
//! ```
//!
//! `w_i` is 1.0 for an ordinary token. Tokens belonging to a recognized
//! domain phrase ("bile titan", "weak point") carry the phrase weight, so a
//! single match on them outweighs several generic matches.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// BM25 scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Bm25Params {
    /// Term frequency saturation. Default: 1.2
    pub k1: f32,

    /// Document length normalization, 0 = none, 1 = full. Default: 0.75
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Smoothed IDF, always positive:
/// `ln((N - df + 0.5) / (df + 0.5) + 1)`.
#[inline]
pub fn idf(num_docs: usize, doc_freq: usize) -> f32 {
    let n = num_docs as f32;
    let df = doc_freq as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// BM25 contribution of one term to one document.
#[inline]
pub fn bm25_term_score(
    term_freq: usize,
    doc_len: usize,
    avg_doc_len: f32,
    idf_value: f32,
    params: &Bm25Params,
) -> f32 {
    let tf = term_freq as f32;
    let dl = doc_len as f32;
    let k1 = params.k1;
    let b = params.b;

    let length_ratio = if avg_doc_len > 0.0 { dl / avg_doc_len } else { 1.0 };
    let numerator = tf * (k1 + 1.0);
    let denominator = tf + k1 * (1.0 - b + b * length_ratio);

    idf_value * numerator / denominator
}

/// A query term with its IDF and query-side weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredTerm<'a> {
    pub term: &'a str,
    pub idf: f32,
    pub weight: f32,
}

/// Weighted BM25 score for a document given its term-frequency lookup.
pub fn bm25_score<F>(
    query_terms: &[ScoredTerm<'_>],
    doc_term_freqs: F,
    doc_len: usize,
    avg_doc_len: f32,
    params: &Bm25Params,
) -> f32
where
    F: Fn(&str) -> usize,
{
    query_terms
        .iter()
        .map(|qt| {
            let tf = doc_term_freqs(qt.term);
            if tf == 0 {
                0.0
            } else {
                qt.weight * bm25_term_score(tf, doc_len, avg_doc_len, qt.idf, params)
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf_common_vs_rare() {
        let common = idf(1000, 900);
        let rare = idf(1000, 10);
        assert!(common > 0.0);
        assert!(common < 0.5);
        assert!(rare > 3.0);
    }

    #[test]
    fn test_idf_edge_cases() {
        assert!(idf(1000, 0).is_finite());
        assert!(idf(1000, 1000) > 0.0);
        assert!(idf(0, 0) > 0.0);
    }

    #[test]
    fn test_bm25_length_normalization() {
        let params = Bm25Params::default();
        let idf_val = idf(100, 10);

        let score_short = bm25_term_score(3, 50, 100.0, idf_val, &params);
        let score_long = bm25_term_score(3, 200, 100.0, idf_val, &params);

        assert!(score_short > score_long);
    }

    #[test]
    fn test_bm25_tf_saturation() {
        let params = Bm25Params::default();
        let idf_val = idf(100, 10);

        let score_1 = bm25_term_score(1, 100, 100.0, idf_val, &params);
        let score_5 = bm25_term_score(5, 100, 100.0, idf_val, &params);
        let score_100 = bm25_term_score(100, 100, 100.0, idf_val, &params);

        assert!(score_5 > score_1);
        assert!(score_100 > score_5);
        assert!(score_100 < idf_val * (params.k1 + 1.0));
    }

    #[test]
    fn test_zero_avg_doc_len_is_finite() {
        let score = bm25_term_score(1, 0, 0.0, 1.0, &Bm25Params::default());
        assert!(score.is_finite());
    }

    #[test]
    fn test_weight_scales_contribution() {
        let params = Bm25Params::default();
        let doc_tf = |term: &str| match term {
            "titan" => 1,
            _ => 0,
        };

        let plain = [ScoredTerm { term: "titan", idf: 2.0, weight: 1.0 }];
        let boosted = [ScoredTerm { term: "titan", idf: 2.0, weight: 5.0 }];

        let s1 = bm25_score(&plain, doc_tf, 10, 10.0, &params);
        let s5 = bm25_score(&boosted, doc_tf, 10, 10.0, &params);
        assert!((s5 - 5.0 * s1).abs() < 1e-5);
    }

    #[test]
    fn test_bm25_score_no_match() {
        let params = Bm25Params::default();
        let terms = [ScoredTerm { term: "titan", idf: 2.0, weight: 1.0 }];
        assert_eq!(bm25_score(&terms, |_| 0, 100, 100.0, &params), 0.0);
    }
}
