//! Error types for gkr-core.
//!
//! Two families live here:
//!
//! - [`GkrError`]: configuration-class failures (missing or corrupt game
//!   indexes, invalid settings). The only errors a caller of
//!   [`crate::RetrievalEngine::query`] can see.
//! - [`ExternalServiceError`]: an embedding or completion call failed or
//!   timed out. Always recovered inside the pipeline by a fallback path.

use std::path::PathBuf;

use gkr_db::DbError;
use gkr_model::ModelError;
use thiserror::Error;

// ============================================================================
// GkrError
// ============================================================================

/// Fatal configuration errors surfaced to callers.
#[derive(Error, Debug)]
pub enum GkrError {
    /// No index directory exists for the requested game.
    #[error("No index found for game `{game_id}`. Available games: {}", format_available(.available))]
    GameIndexNotFound {
        /// The requested game identifier.
        game_id: String,
        /// Game identifiers with a complete index on disk.
        available: Vec<String>,
    },

    /// An index exists but was written in a format this build can't read.
    #[error("Index for game `{game_id}` is incompatible ({path}): {reason}")]
    IndexIncompatible {
        /// The affected game.
        game_id: String,
        /// The index file or directory.
        path: PathBuf,
        /// What didn't match.
        reason: String,
    },

    /// Reading an index file failed.
    #[error("Index I/O error at {path}: {message}")]
    IndexIo {
        /// The file that could not be read or written.
        path: PathBuf,
        /// Error details.
        message: String,
    },

    /// An index file exists but its content is invalid.
    #[error("Index parse error at {path}: {message}")]
    IndexParse {
        /// The file that failed to parse.
        path: PathBuf,
        /// Error details.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("Config file invalid at {path}: {message}")]
    InvalidConfigFile {
        /// The config file path.
        path: PathBuf,
        /// Error details.
        message: String,
    },

    /// A wrapped I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A wrapped JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A wrapped YAML serialization error.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    }
}

impl GkrError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Attach a game id to a storage-layer error.
    pub(crate) fn from_db(game_id: &str, err: DbError) -> Self {
        match err {
            DbError::VectorIo { path, message } | DbError::FragmentIo { path, message } => {
                Self::IndexIo { path, message }
            }
            DbError::VectorParse { path, message } | DbError::FragmentParse { path, message } => {
                Self::IndexParse { path, message }
            }
            DbError::IndexNotFound { path } => Self::IndexIo {
                path,
                message: "vector index not found".to_string(),
            },
            DbError::IndexIncompatible { path, reason } => Self::IndexIncompatible {
                game_id: game_id.to_string(),
                path,
                reason,
            },
            DbError::DimensionMismatch { expected, actual } => Self::IndexIncompatible {
                game_id: game_id.to_string(),
                path: PathBuf::new(),
                reason: format!("vector dimension mismatch: expected {expected}, got {actual}"),
            },
            DbError::Io(e) => Self::Io(e),
            DbError::Json(e) => Self::Json(e),
            other => Self::Other(anyhow::anyhow!(other.to_string())),
        }
    }
}

impl From<ModelError> for GkrError {
    fn from(err: ModelError) -> Self {
        Self::InvalidConfiguration {
            message: err.to_string(),
            hint: "Check the `embedding` and `completion` sections of the config".to_string(),
        }
    }
}

// ============================================================================
// ExternalServiceError
// ============================================================================

/// A call to an external collaborator failed. Recovered locally, never
/// returned from the public API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalServiceError {
    /// Every attempt failed; `message` is the last failure.
    #[error("{service} failed after {attempts} attempt(s): {message}")]
    Failed {
        /// Which collaborator ("embedding", "completion").
        service: String,
        /// Attempts made.
        attempts: u32,
        /// Last error message.
        message: String,
    },

    /// The last attempt exceeded its deadline.
    #[error("{service} timed out after {timeout_ms}ms ({attempts} attempt(s))")]
    Timeout {
        /// Which collaborator.
        service: String,
        /// Attempts made.
        attempts: u32,
        /// Per-attempt timeout.
        timeout_ms: u64,
    },
}

impl ExternalServiceError {
    /// The collaborator this error came from.
    pub fn service(&self) -> &str {
        match self {
            Self::Failed { service, .. } | Self::Timeout { service, .. } => service,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
