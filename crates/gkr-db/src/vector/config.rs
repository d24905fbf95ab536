//! Vector index configuration and metadata.

use super::traits::VectorMetric;
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Default backend name.
pub const DEFAULT_BACKEND: &str = "simple";

/// Filename for index metadata.
pub const INDEX_META_FILENAME: &str = "index.meta.json";

/// Schema version this build reads and writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// VectorIndexConfig
// ============================================================================

/// Configuration for creating or opening a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexConfig {
    /// Dimension of vectors in the index.
    pub dimension: usize,

    /// Path to the index directory.
    pub path: PathBuf,

    /// Backend to use.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Distance metric for similarity search.
    #[serde(default)]
    pub metric: VectorMetric,

    /// Whether to create the index if it doesn't exist.
    #[serde(default)]
    pub create_if_missing: bool,
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

impl VectorIndexConfig {
    /// Create a new config with required fields.
    pub fn new(dimension: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            dimension,
            path: path.into(),
            backend: DEFAULT_BACKEND.to_string(),
            metric: VectorMetric::Cosine,
            create_if_missing: false,
        }
    }

    /// Config that opens exactly what `meta` describes.
    pub fn from_meta(meta: &VectorIndexMeta, path: impl Into<PathBuf>) -> Self {
        Self::new(meta.dimension, path)
            .with_backend(meta.backend.clone())
            .with_metric(meta.metric)
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    /// Set the distance metric.
    pub fn with_metric(mut self, metric: VectorMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set whether to create the index if missing.
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

// ============================================================================
// VectorIndexMeta
// ============================================================================

/// Metadata for a persisted vector index, stored in `index.meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorIndexMeta {
    /// Backend used for this index.
    pub backend: String,

    /// Dimension of vectors.
    pub dimension: usize,

    /// Distance metric.
    pub metric: VectorMetric,

    /// Number of vectors (approximate, may be stale).
    #[serde(default)]
    pub count: usize,

    /// Schema version of the on-disk format.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Embedding model the vectors were produced with, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last update timestamp (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl VectorIndexMeta {
    /// Create new metadata.
    pub fn new(backend: impl Into<String>, dimension: usize, metric: VectorMetric) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            backend: backend.into(),
            dimension,
            metric,
            count: 0,
            schema_version: CURRENT_SCHEMA_VERSION,
            embedding_model: None,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        }
    }

    /// Record the embedding model.
    pub fn with_embedding_model(mut self, model_id: impl Into<String>) -> Self {
        self.embedding_model = Some(model_id.into());
        self
    }

    /// Update the count and timestamp.
    pub fn update_count(&mut self, count: usize) {
        self.count = count;
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
    }
}

// ============================================================================
// VectorIndexCompatibility
// ============================================================================

/// Result of checking index compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorIndexCompatibility {
    /// Index is compatible and can be opened.
    Compatible,

    /// Index doesn't exist.
    NotFound,

    /// Index was written with a different on-disk schema.
    IncompatibleSchema { expected: u32, actual: u32 },

    /// Index exists but has incompatible dimension.
    IncompatibleDimension { expected: usize, actual: usize },

    /// Index exists but uses a different backend.
    IncompatibleBackend { expected: String, actual: String },

    /// Index exists but uses a different metric.
    IncompatibleMetric {
        expected: VectorMetric,
        actual: VectorMetric,
    },

    /// Index metadata is corrupted or unreadable.
    Corrupted(String),
}

impl VectorIndexCompatibility {
    /// Check if the index is compatible.
    pub fn is_compatible(&self) -> bool {
        matches!(self, VectorIndexCompatibility::Compatible)
    }

    /// Check if the index doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VectorIndexCompatibility::NotFound)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Check if an existing index is compatible with the given config.
pub fn check_index_compatibility(config: &VectorIndexConfig) -> VectorIndexCompatibility {
    let meta_path = config.path.join(INDEX_META_FILENAME);

    if !meta_path.exists() {
        if config.path.is_dir() {
            let entries = config.path.read_dir().map(|rd| rd.count()).unwrap_or(0);
            if entries == 0 {
                return VectorIndexCompatibility::NotFound;
            }
            return VectorIndexCompatibility::Corrupted(
                "Index directory exists but has no metadata".to_string(),
            );
        }
        return VectorIndexCompatibility::NotFound;
    }

    match load_index_meta(&config.path) {
        Ok(meta) => {
            if meta.schema_version != CURRENT_SCHEMA_VERSION {
                return VectorIndexCompatibility::IncompatibleSchema {
                    expected: CURRENT_SCHEMA_VERSION,
                    actual: meta.schema_version,
                };
            }

            if meta.dimension != config.dimension {
                return VectorIndexCompatibility::IncompatibleDimension {
                    expected: config.dimension,
                    actual: meta.dimension,
                };
            }

            if meta.backend != config.backend {
                return VectorIndexCompatibility::IncompatibleBackend {
                    expected: config.backend.clone(),
                    actual: meta.backend,
                };
            }

            if meta.metric != config.metric {
                return VectorIndexCompatibility::IncompatibleMetric {
                    expected: config.metric,
                    actual: meta.metric,
                };
            }

            VectorIndexCompatibility::Compatible
        }
        Err(e) => VectorIndexCompatibility::Corrupted(e.to_string()),
    }
}

/// Load index metadata from a directory.
pub fn load_index_meta(path: &Path) -> DbResult<VectorIndexMeta> {
    let meta_path = path.join(INDEX_META_FILENAME);
    debug!("Loading index metadata from {:?}", meta_path);

    let content = fs::read_to_string(&meta_path).map_err(|e| DbError::VectorIo {
        path: meta_path.clone(),
        message: format!("Failed to read index metadata: {}", e),
    })?;

    let meta: VectorIndexMeta =
        serde_json::from_str(&content).map_err(|e| DbError::VectorParse {
            path: meta_path,
            message: format!("Failed to parse index metadata: {}", e),
        })?;

    Ok(meta)
}

/// Write index metadata to a directory.
pub fn write_index_meta(path: &Path, meta: &VectorIndexMeta) -> DbResult<()> {
    let meta_path = path.join(INDEX_META_FILENAME);
    debug!("Writing index metadata to {:?}", meta_path);

    if !path.exists() {
        fs::create_dir_all(path)?;
    }

    let content = serde_json::to_string_pretty(meta)?;
    fs::write(&meta_path, content)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_builder() {
        let config = VectorIndexConfig::new(384, "/tmp/test")
            .with_backend("simple")
            .with_metric(VectorMetric::L2)
            .with_create_if_missing(true);

        assert_eq!(config.dimension, 384);
        assert_eq!(config.backend, "simple");
        assert_eq!(config.metric, VectorMetric::L2);
        assert!(config.create_if_missing);
    }

    #[test]
    fn test_meta_serialization() {
        let meta = VectorIndexMeta::new("simple", 384, VectorMetric::Cosine)
            .with_embedding_model("bge-m3");

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"backend\":\"simple\""));
        assert!(json.contains("\"schemaVersion\":1"));
        assert!(json.contains("\"embeddingModel\":\"bge-m3\""));

        let parsed: VectorIndexMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.dimension, 384);
        assert_eq!(parsed.embedding_model.as_deref(), Some("bge-m3"));
    }

    #[test]
    fn test_compatibility_check_not_found() {
        let config = VectorIndexConfig::new(384, "/nonexistent/path/xyz123");
        assert!(check_index_compatibility(&config).is_not_found());
    }

    #[test]
    fn test_compatibility_detects_schema_and_dimension() {
        let tmp = TempDir::new().unwrap();
        let mut meta = VectorIndexMeta::new("simple", 4, VectorMetric::Cosine);
        write_index_meta(tmp.path(), &meta).unwrap();

        let config = VectorIndexConfig::new(4, tmp.path());
        assert!(check_index_compatibility(&config).is_compatible());

        let wrong_dim = VectorIndexConfig::new(8, tmp.path());
        assert_eq!(
            check_index_compatibility(&wrong_dim),
            VectorIndexCompatibility::IncompatibleDimension { expected: 8, actual: 4 }
        );

        meta.schema_version = 99;
        write_index_meta(tmp.path(), &meta).unwrap();
        assert_eq!(
            check_index_compatibility(&config),
            VectorIndexCompatibility::IncompatibleSchema { expected: 1, actual: 99 }
        );
    }

    #[test]
    fn test_compatibility_corrupted_meta() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(INDEX_META_FILENAME), "{ nope").unwrap();
        let config = VectorIndexConfig::new(4, tmp.path());
        assert!(matches!(
            check_index_compatibility(&config),
            VectorIndexCompatibility::Corrupted(_)
        ));
    }
}
