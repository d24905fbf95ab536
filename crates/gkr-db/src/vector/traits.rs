//! Vector index traits and core types.

use crate::error::DbResult;
use crate::fragment::FragmentId;
use serde::{Deserialize, Serialize};

// ============================================================================
// VectorMetric
// ============================================================================

/// Distance metric for vector similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMetric {
    /// Cosine similarity (default).
    #[default]
    Cosine,
    /// Dot product.
    Dot,
    /// Euclidean (L2) distance.
    L2,
}

impl VectorMetric {
    /// Get the metric name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorMetric::Cosine => "cosine",
            VectorMetric::Dot => "dot",
            VectorMetric::L2 => "l2",
        }
    }
}

impl std::fmt::Display for VectorMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// VectorInsert
// ============================================================================

/// A fragment embedding to insert or replace in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorInsert {
    /// Fragment this vector embeds.
    pub id: FragmentId,

    /// The embedding vector.
    pub vector: Vec<f32>,
}

impl VectorInsert {
    pub fn new(id: impl Into<FragmentId>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
        }
    }
}

// ============================================================================
// VectorSearchResult
// ============================================================================

/// A single result from a vector similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSearchResult {
    /// Fragment whose vector matched.
    pub id: FragmentId,

    /// Similarity score, higher is better for every metric.
    pub score: f32,
}

impl VectorSearchResult {
    pub fn new(id: impl Into<FragmentId>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

// ============================================================================
// VectorIndexBackend Trait
// ============================================================================

/// Core trait for vector index backends.
///
/// ## Implementation Notes
///
/// - Backends are shared across query tasks and must be `Send + Sync`.
/// - `query` returns results best first and never errors on zero matches.
/// - Upsert semantics: a vector with an existing ID replaces the old one.
pub trait VectorIndexBackend: Send + Sync {
    /// Query the index for the `limit` most similar vectors.
    fn query(&self, embedding: &[f32], limit: usize) -> DbResult<Vec<VectorSearchResult>>;

    /// Insert or update vectors in the index.
    fn upsert(&self, vectors: &[VectorInsert]) -> DbResult<()>;

    /// Flush pending writes to persistent storage.
    fn flush(&self) -> DbResult<()>;

    /// Get the number of vectors in the index.
    fn len(&self) -> DbResult<usize>;

    /// Check if the index is empty.
    fn is_empty(&self) -> DbResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Get the dimension of vectors in this index.
    fn dimension(&self) -> usize;

    /// Get the distance metric used by this index.
    fn metric(&self) -> VectorMetric;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_metric() {
        assert_eq!(VectorMetric::Cosine.as_str(), "cosine");
        assert_eq!(VectorMetric::Dot.as_str(), "dot");
        assert_eq!(VectorMetric::L2.as_str(), "l2");
        assert_eq!(VectorMetric::default(), VectorMetric::Cosine);
    }

    #[test]
    fn test_vector_insert_serialization() {
        let insert = VectorInsert::new("frag-1", vec![1.0, 2.0]);
        let json = serde_json::to_string(&insert).unwrap();
        assert_eq!(json, r#"{"id":"frag-1","vector":[1.0,2.0]}"#);
    }
}
