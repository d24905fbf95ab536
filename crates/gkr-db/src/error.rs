//! Error types for gkr-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gkr-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in gkr-db operations.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Vector index errors
    // ========================================================================
    /// Vector index I/O error.
    #[error("Vector index I/O error at {path}: {message}")]
    VectorIo { path: PathBuf, message: String },

    /// Vector index parse error.
    #[error("Vector index parse error at {path}: {message}")]
    VectorParse { path: PathBuf, message: String },

    /// Vector dimension mismatch.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector index not found.
    #[error("Vector index not found at {path}")]
    IndexNotFound { path: PathBuf },

    /// Vector index exists but cannot be used with the requested settings.
    #[error("Vector index at {path} is incompatible: {reason}")]
    IndexIncompatible { path: PathBuf, reason: String },

    // ========================================================================
    // Fragment side-table errors
    // ========================================================================
    /// Fragment side-table I/O error.
    #[error("Fragment table I/O error at {path}: {message}")]
    FragmentIo { path: PathBuf, message: String },

    /// Fragment side-table parse error.
    #[error("Fragment table parse error at {path}: {message}")]
    FragmentParse { path: PathBuf, message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a vector I/O error.
    pub fn vector_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a vector parse error.
    pub fn vector_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an index incompatible error.
    pub fn index_incompatible(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::IndexIncompatible {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The file or directory this error refers to, when there is one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::VectorIo { path, .. }
            | Self::VectorParse { path, .. }
            | Self::IndexNotFound { path }
            | Self::IndexIncompatible { path, .. }
            | Self::FragmentIo { path, .. }
            | Self::FragmentParse { path, .. } => Some(path),
            _ => None,
        }
    }
}
