//! # gkr-model
//!
//! Model layer for GKR - query embeddings and text completion.
//!
//! The retrieval pipeline talks to models only through the two traits in this
//! crate. Both collaborators are optional: a missing or failing model degrades
//! retrieval quality, it never stops a query.
//!
//! ## Features
//!
//! - `ollama` (default): remote inference through the Ollama HTTP API
//!
//! ## Usage
//!
//! ```ignore
//! use gkr_model::{create_embedding_model, EmbeddingConfig};
//!
//! if let Some(model) = create_embedding_model(&EmbeddingConfig::default())? {
//!     let vector = model.embed_one("how to kill bile titan").await?;
//!     assert_eq!(vector.len(), model.dimension());
//! }
//! ```

pub mod config;
pub mod error;

#[cfg(feature = "ollama")]
mod ollama;

use async_trait::async_trait;
use std::sync::Arc;

pub use config::{CompletionConfig, EmbeddingConfig, ProviderKind, DEFAULT_OLLAMA_URL};
pub use error::{ModelError, ModelResult};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaCompletionModel, OllamaEmbeddingModel};

// ============================================================================
// Embedding Model Trait
// ============================================================================

/// Trait for embedding models (bi-encoders).
///
/// Implementations must be `Send + Sync`; one instance serves every
/// concurrent query.
#[async_trait]
pub trait EmbeddingModel: Send + Sync + std::fmt::Debug {
    /// Generate embeddings for a batch of texts, one vector per input, each
    /// of length `dimension()`.
    async fn embed(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> ModelResult<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::unexpected_response(self.model_id(), "empty embedding batch"))
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the model ID.
    fn model_id(&self) -> &str;
}

// ============================================================================
// Completion Model Trait
// ============================================================================

/// Trait for text-completion models used for translation, intent
/// classification and query rewriting.
#[async_trait]
pub trait CompletionModel: Send + Sync + std::fmt::Debug {
    /// Complete `prompt` and return the raw generated text.
    async fn complete(&self, prompt: &str) -> ModelResult<String>;

    /// Get the model ID.
    fn model_id(&self) -> &str;
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create an embedding model from configuration.
///
/// Returns `Ok(None)` when the provider is `none`.
pub fn create_embedding_model(
    config: &EmbeddingConfig,
) -> ModelResult<Option<Arc<dyn EmbeddingModel>>> {
    match config.provider {
        ProviderKind::None => Ok(None),
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(Some(Arc::new(OllamaEmbeddingModel::new(config)?))),
        #[cfg(not(feature = "ollama"))]
        ProviderKind::Ollama => Err(ModelError::provider_not_available(
            "ollama",
            "gkr-model was built without the 'ollama' feature",
        )),
    }
}

/// Create a completion model from configuration.
///
/// Returns `Ok(None)` when the provider is `none`.
pub fn create_completion_model(
    config: &CompletionConfig,
) -> ModelResult<Option<Arc<dyn CompletionModel>>> {
    match config.provider {
        ProviderKind::None => Ok(None),
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(Some(Arc::new(OllamaCompletionModel::new(config)?))),
        #[cfg(not(feature = "ollama"))]
        ProviderKind::Ollama => Err(ModelError::provider_not_available(
            "ollama",
            "gkr-model was built without the 'ollama' feature",
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
