//! Vector index backend implementations.

mod simple;

pub use simple::SimpleFileVectorIndex;

use super::config::{
    check_index_compatibility, write_index_meta, VectorIndexCompatibility, VectorIndexConfig,
    VectorIndexMeta,
};
use super::traits::VectorIndexBackend;
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Open a vector index with the given configuration.
///
/// This will:
/// 1. Check if an existing index is compatible
/// 2. Create a new index if needed (and `create_if_missing` is true)
/// 3. Open the appropriate backend
///
/// # Errors
///
/// Returns an error if:
/// - The index is missing and `create_if_missing` is false
/// - The index exists but is incompatible or its metadata is corrupted
/// - The backend is not supported
pub fn open_vector_index(config: &VectorIndexConfig) -> DbResult<Arc<dyn VectorIndexBackend>> {
    debug!("Opening vector index at {:?}", config.path);

    match check_index_compatibility(config) {
        VectorIndexCompatibility::Compatible => {
            debug!("Index is compatible, opening...");
        }
        VectorIndexCompatibility::NotFound => {
            if config.create_if_missing {
                info!("Index not found, creating new index at {:?}", config.path);
                std::fs::create_dir_all(&config.path)?;
                let meta = VectorIndexMeta::new(&config.backend, config.dimension, config.metric);
                write_index_meta(&config.path, &meta)?;
            } else {
                return Err(DbError::IndexNotFound {
                    path: config.path.clone(),
                });
            }
        }
        VectorIndexCompatibility::IncompatibleSchema { expected, actual } => {
            return Err(DbError::index_incompatible(
                &config.path,
                format!(
                    "Schema version mismatch: expected {}, found {}",
                    expected, actual
                ),
            ));
        }
        VectorIndexCompatibility::IncompatibleDimension { expected, actual } => {
            return Err(DbError::DimensionMismatch { expected, actual });
        }
        VectorIndexCompatibility::IncompatibleBackend { expected, actual } => {
            return Err(DbError::index_incompatible(
                &config.path,
                format!(
                    "Backend mismatch: expected '{}', found '{}'",
                    expected, actual
                ),
            ));
        }
        VectorIndexCompatibility::IncompatibleMetric { expected, actual } => {
            return Err(DbError::index_incompatible(
                &config.path,
                format!(
                    "Metric mismatch: expected '{}', found '{}'",
                    expected, actual
                ),
            ));
        }
        VectorIndexCompatibility::Corrupted(msg) => {
            return Err(DbError::index_incompatible(
                &config.path,
                format!("Index corrupted: {}", msg),
            ));
        }
    }

    match config.backend.as_str() {
        "simple" => {
            let index = SimpleFileVectorIndex::open(config)?;
            Ok(Arc::new(index))
        }
        backend => Err(DbError::index_incompatible(
            &config.path,
            format!(
                "Unknown backend: '{}'. Available backends: {}",
                backend,
                available_backends().join(", ")
            ),
        )),
    }
}

/// Get a list of available backend names.
pub fn available_backends() -> Vec<&'static str> {
    vec!["simple"]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{write_index_meta, VectorInsert, VectorMetric};
    use tempfile::TempDir;

    #[test]
    fn test_available_backends() {
        assert_eq!(available_backends(), vec!["simple"]);
    }

    #[test]
    fn test_open_missing_without_create_fails() {
        let tmp = TempDir::new().unwrap();
        let config = VectorIndexConfig::new(3, tmp.path().join("vectors"));
        let err = open_vector_index(&config).err().unwrap();
        assert!(matches!(err, DbError::IndexNotFound { .. }));
    }

    #[test]
    fn test_create_then_reopen() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("vectors");
        let config = VectorIndexConfig::new(3, &dir).with_create_if_missing(true);

        let index = open_vector_index(&config).unwrap();
        index
            .upsert(&[VectorInsert::new("a", vec![1.0, 0.0, 0.0])])
            .unwrap();

        let reopened = open_vector_index(&config.with_create_if_missing(false)).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let tmp = TempDir::new().unwrap();
        let meta = VectorIndexMeta::new("lancedb", 3, VectorMetric::Cosine);
        write_index_meta(tmp.path(), &meta).unwrap();

        let config = VectorIndexConfig::from_meta(&meta, tmp.path());
        let err = open_vector_index(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown backend"));
    }
}
