//! Error types for gkr-model.

use thiserror::Error;

/// Result type alias for gkr-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur in gkr-model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Inference errors
    // ========================================================================
    /// Embedding generation failed.
    #[error("Embedding failed for model '{model_id}': {message}")]
    EmbeddingFailed { model_id: String, message: String },

    /// Text completion failed.
    #[error("Completion failed for model '{model_id}': {message}")]
    CompletionFailed { model_id: String, message: String },

    /// The backend answered but the payload was not what we asked for.
    #[error("Unexpected response from '{model_id}': {message}")]
    UnexpectedResponse { model_id: String, message: String },

    // ========================================================================
    // Provider errors
    // ========================================================================
    /// Provider not available.
    #[error("Provider '{provider}' not available: {reason}")]
    ProviderNotAvailable { provider: String, reason: String },

    /// Provider configuration is incomplete.
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    // ========================================================================
    // I/O errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Create an embedding failed error.
    pub fn embedding_failed(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingFailed {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create a completion failed error.
    pub fn completion_failed(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CompletionFailed {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected response error.
    pub fn unexpected_response(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create a provider not available error.
    pub fn provider_not_available(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderNotAvailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}
