//! Configuration for the retrieval engine.
//!
//! One YAML file, by default `~/.gkr/config.yaml`. Every section is optional
//! and falls back to built-in defaults, so a missing file is a valid
//! configuration.
//!
//! ```yaml
//! dataDir: /opt/gkr/data
//! defaultTopK: 5
//! embedding:
//!   provider: ollama
//!   modelId: bge-m3
//!   dimension: 1024
//! completion:
//!   provider: none
//! calls:
//!   embedding: { maxAttempts: 1, initialBackoffMs: 0, backoffMultiplier: 1.0, maxBackoffMs: 0, timeoutMs: 5000 }
//! fusion:
//!   rrfK: 60
//!   vectorWeight: 0.5
//!   lexicalWeight: 0.5
//! rerank:
//!   confidenceThreshold: 0.7
//!   semanticSignal: vector
//!   subIntents:
//!     share: 0.5
//! queryProcessing:
//!   cacheTtlSecs: 3600
//!   guidanceRules:
//!     - triggers: [how to, 怎么]
//!       keywords: [strategy, guide]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use gkr_model::{CompletionConfig, EmbeddingConfig};
use serde::{Deserialize, Serialize};

use crate::errors::GkrError;
use crate::external::CallPolicies;
use crate::fusion::FusionConfig;
use crate::game::GameCatalog;
use crate::intent::TaxonomyConfig;
use crate::query::QueryProcessingConfig;
use crate::rerank::RerankConfig;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV_VAR: &str = "GKR_CONFIG";

/// Fragments returned per query when the caller does not say.
pub const DEFAULT_TOP_K: usize = 5;

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Directory holding one subdirectory per game. Default: `~/.gkr/data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Replacement for the built-in game catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub calls: CallPolicies,

    #[serde(default)]
    pub fusion: FusionConfig,

    #[serde(default)]
    pub rerank: RerankConfig,

    #[serde(default)]
    pub intents: TaxonomyConfig,

    #[serde(default)]
    pub query_processing: QueryProcessingConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            catalog_path: None,
            default_top_k: DEFAULT_TOP_K,
            embedding: EmbeddingConfig::default(),
            completion: CompletionConfig::default(),
            calls: CallPolicies::default(),
            fusion: FusionConfig::default(),
            rerank: RerankConfig::default(),
            intents: TaxonomyConfig::default(),
            query_processing: QueryProcessingConfig::default(),
        }
    }
}

impl RetrievalConfig {
    /// Load from `$GKR_CONFIG` if set, otherwise `~/.gkr/config.yaml`.
    ///
    /// # Errors
    ///
    /// Returns [`GkrError::InvalidConfigFile`] if the file exists but cannot
    /// be parsed, [`GkrError::InvalidConfiguration`] if validation fails.
    pub fn load_default() -> Result<Self, GkrError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_path(Path::new(&path));
        }
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path. A missing file yields the defaults.
    pub fn from_path(path: &Path) -> Result<Self, GkrError> {
        if !path.exists() {
            tracing::debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GkrError::InvalidConfigFile {
            path: path.to_path_buf(),
            message: format!("Failed to read: {e}"),
        })?;

        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| GkrError::InvalidConfigFile {
                path: path.to_path_buf(),
                message: format!("Failed to parse: {e}"),
            })?;

        for warning in config.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// `~/.gkr`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".gkr"))
    }

    /// `~/.gkr/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join("config.yaml"))
    }

    /// The configured data directory, or `~/.gkr/data`, or `./data` when
    /// there is no home directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| Self::default_dir().map(|d| d.join("data")))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// The game catalog: `catalogPath` if set, otherwise the built-in one.
    pub fn load_catalog(&self) -> Result<GameCatalog, GkrError> {
        match &self.catalog_path {
            Some(path) => GameCatalog::from_path(path),
            None => GameCatalog::builtin(),
        }
    }

    /// Validates every section.
    ///
    /// Returns the first hard error as [`GkrError::InvalidConfiguration`];
    /// non-fatal issues come back as warnings for the caller to log.
    pub fn validate(&self) -> Result<Vec<String>, GkrError> {
        let mut warnings = Vec::new();

        if self.default_top_k == 0 {
            return Err(GkrError::invalid_configuration(
                "defaultTopK must be at least 1",
                "Set defaultTopK to 5",
            ));
        }
        if self.embedding.is_enabled() && self.embedding.dimension == 0 {
            return Err(GkrError::invalid_configuration(
                "embedding.dimension must be positive",
                "Set it to the output size of the embedding model (bge-m3: 1024)",
            ));
        }

        self.calls.validate()?;
        warnings.extend(self.fusion.validate()?);
        warnings.extend(self.rerank.validate()?);
        warnings.extend(self.intents.validate()?);
        warnings.extend(self.query_processing.validate()?);

        if !self.embedding.is_enabled() {
            warnings.push(
                "embedding.provider is none; retrieval will use BM25 only".to_string(),
            );
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gkr_model::ProviderKind;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = RetrievalConfig::default();
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("BM25 only"));
        assert_eq!(config.default_top_k, 5);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = RetrievalConfig::from_path(&temp.path().join("nope.yaml")).unwrap();
        assert_eq!(config, RetrievalConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
dataDir: /srv/gkr
embedding:
  provider: ollama
  dimension: 768
fusion:
  rrfK: 30
rerank:
  semanticSignal: fusion
  subIntents:
    share: 0.3
intents:
  guide:
    keywords: [how to]
    weights: { intentWeight: 0.5, semanticWeight: 0.5 }
"#,
        )
        .unwrap();

        let config = RetrievalConfig::from_path(&path).unwrap();
        assert_eq!(config.resolved_data_dir(), PathBuf::from("/srv/gkr"));
        assert_eq!(config.embedding.provider, ProviderKind::Ollama);
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.fusion.rrf_k, 30.0);
        assert_eq!(config.fusion.vector_weight, 0.5);
        assert_eq!(config.rerank.semantic_signal, crate::rerank::SemanticSignal::Fusion);
        assert_eq!(config.rerank.sub_intents.share, 0.3);
        assert_eq!(config.rerank.sub_intents.profiles.len(), 6);
        assert_eq!(config.intents.guide.keywords, vec!["how to"]);
        assert!(config.intents.guide.patterns.is_empty());
        assert!(!config.intents.wiki.keywords.is_empty());
    }

    #[test]
    fn test_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "fusion: [not: a map").unwrap();
        assert!(matches!(
            RetrievalConfig::from_path(&path),
            Err(GkrError::InvalidConfigFile { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");

        std::fs::write(&path, "fusion:\n  rrfK: 0\n").unwrap();
        assert!(matches!(
            RetrievalConfig::from_path(&path),
            Err(GkrError::InvalidConfiguration { .. })
        ));

        std::fs::write(&path, "fusion:\n  lexicalWeight: -1\n").unwrap();
        assert!(RetrievalConfig::from_path(&path).is_err());

        std::fs::write(
            &path,
            "intents:\n  wiki:\n    weights: { intentWeight: 0.9, semanticWeight: 0.9 }\n",
        )
        .unwrap();
        assert!(RetrievalConfig::from_path(&path).is_err());

        std::fs::write(&path, "intents:\n  wiki:\n    patterns: ['(']\n    weights: { intentWeight: 0.3, semanticWeight: 0.7 }\n").unwrap();
        assert!(RetrievalConfig::from_path(&path).is_err());
    }

    #[test]
    fn test_custom_catalog_path() {
        let temp = TempDir::new().unwrap();
        let catalog = temp.path().join("games.yaml");
        std::fs::write(
            &catalog,
            "games:\n  - id: hades\n    canonicalName: Hades\n    aliases: [hades ii]\n",
        )
        .unwrap();

        let config = RetrievalConfig {
            catalog_path: Some(catalog),
            ..RetrievalConfig::default()
        };
        let loaded = config.load_catalog().unwrap();
        assert_eq!(loaded.resolve("Hades II"), Some("hades"));
        assert!(loaded.get("helldiver2").is_none());
    }
}
