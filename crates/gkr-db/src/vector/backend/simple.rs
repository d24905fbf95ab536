//! Simple file-based vector index backend.
//!
//! Vectors live in a JSONL file and search is an exact linear scan.

use super::super::config::VectorIndexConfig;
use super::super::traits::{VectorIndexBackend, VectorInsert, VectorMetric, VectorSearchResult};
use crate::error::{DbError, DbResult};
use crate::fragment::FragmentId;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, trace};

/// Filename for the JSONL data file.
pub const DATA_FILENAME: &str = "vectors.jsonl";

/// Simple file-based vector index.
pub struct SimpleFileVectorIndex {
    /// Path to the index directory.
    path: PathBuf,

    /// Dimension of vectors.
    dimension: usize,

    /// Distance metric.
    metric: VectorMetric,

    /// In-memory vector store.
    vectors: RwLock<HashMap<FragmentId, Vec<f32>>>,
}

impl SimpleFileVectorIndex {
    /// Open or create a simple file vector index.
    pub fn open(config: &VectorIndexConfig) -> DbResult<Self> {
        debug!("Opening SimpleFileVectorIndex at {:?}", config.path);

        let index = Self {
            path: config.path.clone(),
            dimension: config.dimension,
            metric: config.metric,
            vectors: RwLock::new(HashMap::new()),
        };

        let data_path = config.path.join(DATA_FILENAME);
        if data_path.exists() {
            index.load_from_file(&data_path)?;
        } else if !config.create_if_missing {
            return Err(DbError::vector_io(&data_path, "Vector data file is missing"));
        }

        Ok(index)
    }

    /// Load vectors from a JSONL file. Any malformed line or wrong-sized
    /// vector fails the load.
    fn load_from_file(&self, path: &Path) -> DbResult<()> {
        debug!("Loading vectors from {:?}", path);

        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut vectors = self
            .vectors
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let stored: VectorInsert = serde_json::from_str(&line).map_err(|e| {
                DbError::vector_parse(path, format!("line {}: {}", line_num + 1, e))
            })?;
            if stored.vector.len() != self.dimension {
                return Err(DbError::vector_parse(
                    path,
                    format!(
                        "line {}: expected dimension {}, got {}",
                        line_num + 1,
                        self.dimension,
                        stored.vector.len()
                    ),
                ));
            }
            vectors.insert(stored.id, stored.vector);
        }

        debug!("Loaded {} vectors", vectors.len());
        Ok(())
    }

    /// Save all vectors to the JSONL file, sorted by id for stable diffs.
    fn save_to_file(&self) -> DbResult<()> {
        let data_path = self.path.join(DATA_FILENAME);
        debug!("Saving vectors to {:?}", data_path);

        let vectors = self
            .vectors
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut entries: Vec<_> = vectors.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut file = File::create(&data_path)?;
        for (id, vector) in entries {
            let line = serde_json::to_string(&VectorInsert::new(id.clone(), vector.clone()))?;
            writeln!(file, "{}", line)?;
        }

        debug!("Saved {} vectors", vectors.len());
        Ok(())
    }

    /// Compute similarity between two vectors.
    fn compute_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            VectorMetric::Cosine => cosine_similarity(a, b),
            VectorMetric::Dot => dot_product(a, b),
            VectorMetric::L2 => -euclidean_distance(a, b), // Negate so higher is better
        }
    }
}

impl VectorIndexBackend for SimpleFileVectorIndex {
    fn query(&self, embedding: &[f32], limit: usize) -> DbResult<Vec<VectorSearchResult>> {
        trace!("Querying SimpleFileVectorIndex, limit={}", limit);

        if embedding.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let vectors = self
            .vectors
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut scored: Vec<(f32, &FragmentId)> = vectors
            .iter()
            .map(|(id, v)| (self.compute_similarity(embedding, v), id))
            .collect();

        // Score descending, id ascending so equal scores are reproducible.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });

        let results: Vec<VectorSearchResult> = scored
            .into_iter()
            .take(limit)
            .map(|(score, id)| VectorSearchResult::new(id.clone(), score))
            .collect();

        trace!("Found {} results", results.len());
        Ok(results)
    }

    fn upsert(&self, vectors: &[VectorInsert]) -> DbResult<()> {
        debug!("Upserting {} vectors", vectors.len());

        let mut stored = self
            .vectors
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        for insert in vectors {
            if insert.vector.len() != self.dimension {
                return Err(DbError::DimensionMismatch {
                    expected: self.dimension,
                    actual: insert.vector.len(),
                });
            }
            stored.insert(insert.id.clone(), insert.vector.clone());
        }

        drop(stored);
        self.save_to_file()
    }

    fn flush(&self) -> DbResult<()> {
        self.save_to_file()
    }

    fn len(&self) -> DbResult<usize> {
        let stored = self
            .vectors
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        Ok(stored.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> VectorMetric {
        self.metric
    }
}

// ============================================================================
// Similarity Functions
// ============================================================================

/// Compute cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Compute dot product between two vectors.
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute Euclidean (L2) distance between two vectors.
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

// ============================================================================
// Tests
// ============================================================================
