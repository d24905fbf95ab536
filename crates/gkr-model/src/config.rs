//! Configuration types for gkr-model.
//!
//! These types are embedded in the core's YAML config under `embedding:` and
//! `completion:`; gkr-core re-exports them rather than defining duplicates.

use serde::{Deserialize, Serialize};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

// ============================================================================
// ProviderKind
// ============================================================================

/// Which backend serves a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// No backend; the pipeline runs without this collaborator.
    #[default]
    None,
    /// Remote Ollama API.
    Ollama,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" | "disabled" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            _ => Err(format!(
                "Unknown provider: '{}'. Use 'none' or 'ollama'.",
                s
            )),
        }
    }
}

// ============================================================================
// EmbeddingConfig
// ============================================================================

/// Configuration for the query embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model ID understood by the provider.
    #[serde(default = "default_embedding_model_id")]
    pub model_id: String,

    /// Embedding dimension; must match the game indexes.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Provider base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_embedding_model_id() -> String {
    "bge-m3".to_string()
}

fn default_dimension() -> usize {
    1024
}

fn default_base_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model_id: default_embedding_model_id(),
            dimension: default_dimension(),
            base_url: default_base_url(),
        }
    }
}

impl EmbeddingConfig {
    /// Whether a backend is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.provider != ProviderKind::None
    }
}

// ============================================================================
// CompletionConfig
// ============================================================================

/// Configuration for the text-completion model used for query analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model ID understood by the provider.
    #[serde(default = "default_completion_model_id")]
    pub model_id: String,

    /// Provider base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature. Query analysis wants near-deterministic output.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_completion_model_id() -> String {
    "qwen2.5:7b".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model_id: default_completion_model_id(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl CompletionConfig {
    /// Whether a backend is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.provider != ProviderKind::None
    }
}

// ============================================================================
// Tests
// ============================================================================
