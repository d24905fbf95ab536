//! Ollama HTTP backends.
//!
//! Timeouts and retries are not handled here: the core wraps every call in
//! its own call policy so all external calls fail the same way.

use crate::config::{CompletionConfig, EmbeddingConfig};
use crate::error::{ModelError, ModelResult};
use crate::{CompletionModel, EmbeddingModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

// ============================================================================
// Embeddings
// ============================================================================

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding model served by `POST /api/embed`.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingModel {
    client: reqwest::Client,
    url: String,
    model_id: String,
    dimension: usize,
}

impl OllamaEmbeddingModel {
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        if config.model_id.trim().is_empty() {
            return Err(ModelError::InvalidConfig {
                message: "embedding.modelId must not be empty".to_string(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            url: endpoint(&config.base_url, "api/embed"),
            model_id: config.model_id.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingModel for OllamaEmbeddingModel {
    async fn embed(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>> {
        debug!(model = %self.model_id, count = texts.len(), "Requesting embeddings");

        let request = EmbedRequest {
            model: &self.model_id,
            input: texts,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::embedding_failed(&self.model_id, format!("HTTP error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Ollama embedding request rejected");
            return Err(ModelError::embedding_failed(
                &self.model_id,
                format!("Ollama returned {status}: {body}"),
            ));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            ModelError::unexpected_response(&self.model_id, format!("JSON parse error: {e}"))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(ModelError::unexpected_response(
                &self.model_id,
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            ));
        }
        if let Some(bad) = parsed.embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(ModelError::unexpected_response(
                &self.model_id,
                format!("expected dimension {}, got {}", self.dimension, bad.len()),
            ));
        }

        Ok(parsed.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Completion
// ============================================================================

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Completion model served by `POST /api/generate` in JSON mode.
#[derive(Debug, Clone)]
pub struct OllamaCompletionModel {
    client: reqwest::Client,
    url: String,
    model_id: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaCompletionModel {
    pub fn new(config: &CompletionConfig) -> ModelResult<Self> {
        if config.model_id.trim().is_empty() {
            return Err(ModelError::InvalidConfig {
                message: "completion.modelId must not be empty".to_string(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            url: endpoint(&config.base_url, "api/generate"),
            model_id: config.model_id.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionModel for OllamaCompletionModel {
    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        debug!(model = %self.model_id, prompt_len = prompt.len(), "Requesting completion");

        let request = GenerateRequest {
            model: &self.model_id,
            prompt,
            stream: false,
            format: "json",
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::completion_failed(&self.model_id, format!("HTTP error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Ollama completion request rejected");
            return Err(ModelError::completion_failed(
                &self.model_id,
                format!("Ollama returned {status}: {body}"),
            ));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            ModelError::unexpected_response(&self.model_id, format!("JSON parse error: {e}"))
        })?;
        Ok(parsed.response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("http://localhost:11434/", "api/embed"),
            "http://localhost:11434/api/embed"
        );
    }

    #[test]
    fn test_empty_model_id_rejected() {
        let config = EmbeddingConfig {
            provider: ProviderKind::Ollama,
            model_id: " ".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            OllamaEmbeddingModel::new(&config),
            Err(ModelError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            format: "json",
            options: GenerateOptions {
                temperature: 0.5,
                num_predict: 16,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["format"], "json");
        assert_eq!(json["options"]["num_predict"], 16);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let config = CompletionConfig {
            provider: ProviderKind::Ollama,
            base_url: "http://127.0.0.1:1".to_string(),
            ..CompletionConfig::default()
        };
        let model = OllamaCompletionModel::new(&config).unwrap();
        let err = model.complete("hello").await.unwrap_err();
        assert!(matches!(err, ModelError::CompletionFailed { .. }));
    }
}
