//! Reciprocal Rank Fusion of the vector and lexical result lists.
//!
//! `score(d) = w_vector / (k + rank_vector(d)) + w_lexical / (k + rank_lexical(d))`
//!
//! A fragment missing from one list gets no contribution from it. Raw
//! scores are ignored, only ranks matter, so cosine similarities and BM25
//! scores never need to be put on a common scale.

use std::collections::HashMap;

use gkr_db::FragmentId;
use serde::{Deserialize, Serialize};

use crate::errors::GkrError;
use crate::retriever::RetrievalHit;

// ============================================================================
// Configuration
// ============================================================================

/// Fusion configuration (`fusion:` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionConfig {
    /// RRF smoothing constant. Default: 60
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    /// Weight of the vector list. Default: 0.5
    #[serde(default = "default_weight")]
    pub vector_weight: f32,

    /// Weight of the lexical list. Default: 0.5
    #[serde(default = "default_weight")]
    pub lexical_weight: f32,

    /// Candidates fetched from the vector index before fusion. Default: 10
    #[serde(default = "default_candidates")]
    pub vector_top_k: usize,

    /// Candidates fetched from the BM25 index before fusion. Default: 10
    #[serde(default = "default_candidates")]
    pub lexical_top_k: usize,
}

fn default_rrf_k() -> f32 {
    60.0
}

fn default_weight() -> f32 {
    0.5
}

fn default_candidates() -> usize {
    10
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
            vector_weight: default_weight(),
            lexical_weight: default_weight(),
            vector_top_k: default_candidates(),
            lexical_top_k: default_candidates(),
        }
    }
}

impl FusionConfig {
    /// Validates the fusion configuration, returning warnings for questionable values.
    ///
    /// # Errors
    /// - `rrfK` is 0, negative or not finite
    /// - a weight is negative or not finite
    /// - `vectorTopK` or `lexicalTopK` is 0
    pub fn validate(&self) -> Result<Vec<String>, GkrError> {
        let mut warnings = Vec::new();

        if !(self.rrf_k.is_finite() && self.rrf_k > 0.0) {
            return Err(GkrError::invalid_configuration(
                "fusion.rrfK must be positive",
                "Set rrfK to a positive value (recommended: 60)",
            ));
        }
        if !(self.vector_weight.is_finite() && self.vector_weight >= 0.0) {
            return Err(GkrError::invalid_configuration(
                "fusion.vectorWeight cannot be negative",
                "Set vectorWeight to 0.0 or higher (recommended: 0.5)",
            ));
        }
        if !(self.lexical_weight.is_finite() && self.lexical_weight >= 0.0) {
            return Err(GkrError::invalid_configuration(
                "fusion.lexicalWeight cannot be negative",
                "Set lexicalWeight to 0.0 or higher (recommended: 0.5)",
            ));
        }
        if self.vector_top_k == 0 || self.lexical_top_k == 0 {
            return Err(GkrError::invalid_configuration(
                "fusion.vectorTopK and fusion.lexicalTopK must be at least 1",
                "Set both to 10 or more",
            ));
        }

        let weight_sum = self.vector_weight + self.lexical_weight;
        if weight_sum == 0.0 {
            warnings.push(
                "Both fusion.vectorWeight and fusion.lexicalWeight are 0; every fusion score will be 0"
                    .to_string(),
            );
        } else if (weight_sum - 1.0).abs() > 0.01 {
            warnings.push(format!(
                "fusion weights sum to {weight_sum} (vectorWeight={}, lexicalWeight={}); \
                 weights summing to 1.0 are recommended",
                self.vector_weight, self.lexical_weight
            ));
        }

        if self.rrf_k > 100.0 {
            warnings.push(format!(
                "fusion.rrfK={} is very large; rankings will be heavily smoothed (recommended: 60)",
                self.rrf_k
            ));
        }

        Ok(warnings)
    }

    /// Highest fusion score any fragment can reach: rank 1 in both lists.
    pub fn max_score(&self) -> f32 {
        (self.vector_weight + self.lexical_weight) / (self.rrf_k + 1.0)
    }
}

// ============================================================================
// Fusion
// ============================================================================

/// A fragment after fusion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedHit {
    pub fragment_id: FragmentId,
    /// Sum of the per-source contributions.
    pub fusion_score: f32,
    /// 1-indexed rank in the vector list.
    pub vector_rank: Option<usize>,
    /// 1-indexed rank in the lexical list.
    pub lexical_rank: Option<usize>,
    pub vector_contribution: f32,
    pub lexical_contribution: f32,
}

/// Fuse two rank-ascending lists with weighted RRF.
///
/// Every id from either input appears exactly once in the output. Output is
/// sorted by fusion score descending; equal scores keep first-appearance
/// order (vector list first, then lexical).
///
/// # Errors
///
/// [`GkrError::InvalidConfiguration`] when `config` fails [`FusionConfig::validate`].
pub fn fuse(
    vector_hits: &[RetrievalHit],
    lexical_hits: &[RetrievalHit],
    config: &FusionConfig,
) -> Result<Vec<FusedHit>, GkrError> {
    config.validate()?;

    let k = config.rrf_k;
    let mut fused: Vec<FusedHit> = Vec::with_capacity(vector_hits.len() + lexical_hits.len());
    let mut positions: HashMap<FragmentId, usize> = HashMap::new();

    for hit in vector_hits {
        let contribution = config.vector_weight / (k + hit.rank as f32);
        let pos = *positions.entry(hit.fragment_id.clone()).or_insert_with(|| {
            fused.push(FusedHit {
                fragment_id: hit.fragment_id.clone(),
                fusion_score: 0.0,
                vector_rank: None,
                lexical_rank: None,
                vector_contribution: 0.0,
                lexical_contribution: 0.0,
            });
            fused.len() - 1
        });
        let entry = &mut fused[pos];
        // A duplicate id in one list keeps its best rank
        if entry.vector_rank.is_none() {
            entry.vector_rank = Some(hit.rank);
            entry.vector_contribution = contribution;
        }
    }

    for hit in lexical_hits {
        let contribution = config.lexical_weight / (k + hit.rank as f32);
        let pos = *positions.entry(hit.fragment_id.clone()).or_insert_with(|| {
            fused.push(FusedHit {
                fragment_id: hit.fragment_id.clone(),
                fusion_score: 0.0,
                vector_rank: None,
                lexical_rank: None,
                vector_contribution: 0.0,
                lexical_contribution: 0.0,
            });
            fused.len() - 1
        });
        let entry = &mut fused[pos];
        if entry.lexical_rank.is_none() {
            entry.lexical_rank = Some(hit.rank);
            entry.lexical_contribution = contribution;
        }
    }

    for hit in &mut fused {
        hit.fusion_score = hit.vector_contribution + hit.lexical_contribution;
    }

    // sort_by is stable, so ties stay in first-appearance order
    fused.sort_by(|a, b| {
        b.fusion_score
            .partial_cmp(&a.fusion_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    tracing::debug!(
        vector = vector_hits.len(),
        lexical = lexical_hits.len(),
        fused = fused.len(),
        "RRF fusion complete"
    );

    Ok(fused)
}
