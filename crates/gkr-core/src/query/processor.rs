//! The query processor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gkr_model::CompletionModel;
use serde::{Deserialize, Serialize};

use super::analysis::{build_analysis_prompt, parse_analysis, LlmAnalysis};
use super::cache::QueryCache;
use super::context::{ProcessingMethod, QueryContext, Translation};
use super::language::{detect_language, Language};
use super::rewrite::{ensure_game_name, RewriteConfig};
use crate::errors::GkrError;
use crate::external::CallPolicy;
use crate::game::GameCatalog;
use crate::intent::{IntentLabel, IntentTaxonomy};
use crate::text::normalize_whitespace;

// ============================================================================
// Configuration
// ============================================================================

/// Query processing settings (`queryProcessing:` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryProcessingConfig {
    /// Use the completion model for analysis when one is configured.
    #[serde(default = "default_true")]
    pub use_llm: bool,

    /// Lifetime of a cached query. Default: 3600
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum cached queries. Default: 1000
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    #[serde(flatten)]
    pub rewrite: RewriteConfig,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_cache_capacity() -> u64 {
    1000
}

impl Default for QueryProcessingConfig {
    fn default() -> Self {
        Self {
            use_llm: true,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            rewrite: RewriteConfig::default(),
        }
    }
}

impl QueryProcessingConfig {
    pub fn validate(&self) -> Result<Vec<String>, GkrError> {
        let mut warnings = Vec::new();
        if self.cache_ttl_secs == 0 || self.cache_capacity == 0 {
            return Err(GkrError::invalid_configuration(
                "queryProcessing.cacheTtlSecs and cacheCapacity must be positive",
                "Use the defaults (3600 seconds, 1000 entries)",
            ));
        }
        if !(1..=3).contains(&self.rewrite.max_guidance_keywords) {
            return Err(GkrError::invalid_configuration(
                format!(
                    "queryProcessing.maxGuidanceKeywords must be between 1 and 3, got {}",
                    self.rewrite.max_guidance_keywords
                ),
                "Guide queries get 1 to 3 appended keywords",
            ));
        }
        for (i, rule) in self.rewrite.guidance_rules.iter().enumerate() {
            if rule.triggers.is_empty() || rule.keywords.is_empty() {
                warnings.push(format!(
                    "queryProcessing.guidanceRules[{i}] has no triggers or no keywords and is ignored"
                ));
            }
        }
        if self.rewrite.default_guidance.is_empty() {
            warnings.push(
                "queryProcessing.defaultGuidance is empty; unmatched guide queries are not expanded"
                    .to_string(),
            );
        }
        Ok(warnings)
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Counters since the processor was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorStats {
    pub total_queries: u64,
    pub cache_hits: u64,
    pub llm_successes: u64,
    pub llm_failures: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    total_queries: AtomicU64,
    cache_hits: AtomicU64,
    llm_successes: AtomicU64,
    llm_failures: AtomicU64,
}

// ============================================================================
// QueryProcessor
// ============================================================================

/// Turns raw player text into a [`QueryContext`].
#[derive(Debug)]
pub struct QueryProcessor {
    taxonomy: Arc<IntentTaxonomy>,
    catalog: Arc<GameCatalog>,
    completion: Option<Arc<dyn CompletionModel>>,
    policy: CallPolicy,
    config: QueryProcessingConfig,
    cache: QueryCache,
    counters: StatsCounters,
}

impl QueryProcessor {
    pub fn new(
        taxonomy: Arc<IntentTaxonomy>,
        catalog: Arc<GameCatalog>,
        config: QueryProcessingConfig,
        policy: CallPolicy,
    ) -> Self {
        let cache = QueryCache::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        );
        Self {
            taxonomy,
            catalog,
            completion: None,
            policy,
            config,
            cache,
            counters: StatsCounters::default(),
        }
    }

    /// Use `model` for translation, classification and rewriting.
    pub fn with_completion_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.completion = Some(model);
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            total_queries: self.counters.total_queries.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            llm_successes: self.counters.llm_successes.load(Ordering::Relaxed),
            llm_failures: self.counters.llm_failures.load(Ordering::Relaxed),
        }
    }

    /// Process `raw_text` for the game `game_id`.
    ///
    /// Never fails. Without a completion model, or when it fails, the
    /// deterministic classifier and rewrite rules are used.
    pub async fn process(&self, raw_text: &str, game_id: Option<&str>) -> Arc<QueryContext> {
        self.counters.total_queries.fetch_add(1, Ordering::Relaxed);

        if let Some(cached) = self.cache.get(raw_text, game_id) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(query = raw_text, "Query cache hit");
            return cached;
        }

        let language = detect_language(raw_text);
        let analysis = if language == Language::Unknown {
            None
        } else {
            self.analyze(raw_text).await
        };

        let ctx = self.build_context(raw_text, game_id, language, analysis.as_ref());
        tracing::debug!(
            query = raw_text,
            rewritten = %ctx.rewritten_text,
            intent = %ctx.intent,
            confidence = ctx.confidence,
            method = ?ctx.method,
            "Processed query"
        );

        self.cache.insert_if_absent(Arc::new(ctx))
    }

    async fn analyze(&self, raw_text: &str) -> Option<LlmAnalysis> {
        if !self.config.use_llm {
            return None;
        }
        let model = self.completion.as_ref()?;
        let prompt = build_analysis_prompt(raw_text);

        let result = self
            .policy
            .call("completion", || {
                let model = Arc::clone(model);
                let prompt = prompt.clone();
                async move {
                    let reply = model.complete(&prompt).await.map_err(|e| e.to_string())?;
                    parse_analysis(&reply).map_err(|e| format!("unparseable analysis reply: {e}"))
                }
            })
            .await;

        match result {
            Ok(analysis) => {
                self.counters.llm_successes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(reasoning = ?analysis.reasoning, "Query analysis succeeded");
                Some(analysis)
            }
            Err(e) => {
                self.counters.llm_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("{e}; using deterministic query processing");
                None
            }
        }
    }

    fn build_context(
        &self,
        raw_text: &str,
        game_id: Option<&str>,
        language: Language,
        analysis: Option<&LlmAnalysis>,
    ) -> QueryContext {
        let raw = normalize_whitespace(raw_text);

        let (translated_text, translation) = if language.needs_translation() {
            match analysis.and_then(LlmAnalysis::translation) {
                Some(t) => (Some(normalize_whitespace(t)), Translation::Applied),
                None => (None, Translation::Skipped),
            }
        } else {
            (None, Translation::NotNeeded)
        };
        let base = translated_text.clone().unwrap_or_else(|| raw.clone());

        let mut texts: Vec<&str> = vec![base.as_str()];
        if base != raw {
            texts.push(raw.as_str());
        }

        let game_name = game_id
            .and_then(|id| self.catalog.get(id))
            .map(|g| g.canonical_name.as_str());

        let (intent, confidence, method) = match analysis.and_then(|a| {
            a.intent_label().map(|label| (label, a.confidence()))
        }) {
            Some((label, confidence)) => (label, confidence, ProcessingMethod::Llm),
            None => {
                let phrases: Vec<_> = self.catalog.phrases_for(game_id).collect();
                let c = self.taxonomy.classify(&texts, &phrases);
                (c.label, c.confidence, ProcessingMethod::Deterministic)
            }
        };

        let llm_rewrite = match method {
            ProcessingMethod::Llm => analysis.and_then(LlmAnalysis::rewrite),
            ProcessingMethod::Deterministic => None,
        };
        let rewritten_text = match (intent, llm_rewrite) {
            (IntentLabel::StrategyGuide, Some(rewrite)) => ensure_game_name(rewrite, game_name),
            _ => self.config.rewrite.rewrite(intent, &base, &texts, game_name),
        };
        let llm_lexical = match method {
            ProcessingMethod::Llm => analysis.and_then(LlmAnalysis::lexical_rewrite),
            ProcessingMethod::Deterministic => None,
        };
        let lexical_text = match llm_lexical {
            Some(terms) => normalize_whitespace(terms),
            None => base.clone(),
        };

        QueryContext {
            raw_text: raw_text.to_string(),
            game_id: game_id.map(str::to_string),
            language,
            translated_text,
            translation,
            rewritten_text: if rewritten_text.is_empty() {
                raw.clone()
            } else {
                rewritten_text
            },
            lexical_text: if lexical_text.is_empty() { raw } else { lexical_text },
            intent,
            confidence,
            method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gkr_model::{ModelError, ModelResult};
    use std::sync::atomic::AtomicU32;

    #[derive(Debug)]
    struct ScriptedCompletion {
        reply: Option<String>,
        calls: AtomicU32,
    }

    impl ScriptedCompletion {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                calls: AtomicU32::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedCompletion {
        async fn complete(&self, _prompt: &str) -> ModelResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| ModelError::completion_failed("scripted", "connection refused"))
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    fn no_retry() -> CallPolicy {
        CallPolicy {
            max_attempts: 2,
            initial_backoff_ms: 10,
            backoff_multiplier: 2.0,
            max_backoff_ms: 10,
            timeout_ms: 1_000,
        }
    }

    fn processor() -> QueryProcessor {
        QueryProcessor::new(
            Arc::new(IntentTaxonomy::builtin().unwrap()),
            Arc::new(GameCatalog::builtin().unwrap()),
            QueryProcessingConfig::default(),
            no_retry(),
        )
    }

    #[tokio::test]
    async fn test_deterministic_guide_query() {
        let ctx = processor().process("how to kill bile titan", Some("helldiver2")).await;

        assert_eq!(ctx.language, Language::Latin);
        assert_eq!(ctx.translation, Translation::NotNeeded);
        assert_eq!(ctx.intent, IntentLabel::StrategyGuide);
        assert_eq!(ctx.method, ProcessingMethod::Deterministic);
        assert_eq!(
            ctx.rewritten_text,
            "how to kill bile titan strategy guide Helldivers 2"
        );
        // BM25 sees only the player's own words
        assert_eq!(ctx.lexical_text, "how to kill bile titan");
    }

    #[tokio::test]
    async fn test_cjk_without_model_is_skipped() {
        let ctx = processor().process("法师职业介绍", Some("dst")).await;

        assert_eq!(ctx.language, Language::Cjk);
        assert_eq!(ctx.translation, Translation::Skipped);
        assert_eq!(ctx.translated_text, None);
        // "介绍" is a wiki keyword
        assert_eq!(ctx.intent, IntentLabel::WikiLookup);
        assert_eq!(ctx.rewritten_text, "法师职业介绍");
    }

    #[tokio::test]
    async fn test_llm_translation_and_intent() {
        let model = ScriptedCompletion::replying(
            "```json\n{\"detected_language\": \"zh\", \"translated_query\": \"mage class introduction\", \"intent\": \"wiki\", \"confidence\": 0.92, \"rewritten_query\": \"mage class overview\"}\n```",
        );
        let processor = processor().with_completion_model(model.clone());
        let ctx = processor.process("法师职业介绍", Some("dst")).await;

        assert_eq!(ctx.translation, Translation::Applied);
        assert_eq!(ctx.translated_text.as_deref(), Some("mage class introduction"));
        assert_eq!(ctx.intent, IntentLabel::WikiLookup);
        assert_eq!(ctx.method, ProcessingMethod::Llm);
        assert!((ctx.confidence - 0.92).abs() < 1e-6);
        // Wiki queries are not rewritten
        assert_eq!(ctx.rewritten_text, "mage class introduction");
        assert_eq!(ctx.lexical_text, "mage class introduction");
        assert_eq!(processor.stats().llm_successes, 1);
    }

    #[tokio::test]
    async fn test_llm_guide_rewrite_gets_game_name() {
        let model = ScriptedCompletion::replying(
            "{\"intent\": \"guide\", \"confidence\": 0.8, \"rewritten_query\": \"best loadout for terminids guide\"}",
        );
        let ctx = processor()
            .with_completion_model(model)
            .process("what should I bring vs bugs", Some("helldiver2"))
            .await;

        assert_eq!(ctx.intent, IntentLabel::StrategyGuide);
        assert_eq!(ctx.rewritten_text, "best loadout for terminids guide Helldivers 2");
        assert_eq!(ctx.lexical_text, "what should I bring vs bugs");
    }

    #[tokio::test]
    async fn test_llm_lexical_query_used_for_bm25() {
        let model = ScriptedCompletion::replying(
            "{\"intent\": \"guide\", \"confidence\": 0.8, \"rewritten_query\": \"best loadout for terminids guide\", \"bm25_optimized_query\": \"terminid  loadout\"}",
        );
        let ctx = processor()
            .with_completion_model(model)
            .process("what should I bring vs bugs", Some("helldiver2"))
            .await;

        assert_eq!(ctx.rewritten_text, "best loadout for terminids guide Helldivers 2");
        assert_eq!(ctx.lexical_text, "terminid loadout");
    }

    #[tokio::test]
    async fn test_unrecognized_llm_intent_uses_deterministic() {
        let model = ScriptedCompletion::replying("{\"intent\": \"unknown\"}");
        let ctx = processor()
            .with_completion_model(model)
            .process("how to kill bile titan", None)
            .await;

        assert_eq!(ctx.method, ProcessingMethod::Deterministic);
        assert_eq!(ctx.intent, IntentLabel::StrategyGuide);
    }

    #[tokio::test]
    async fn test_failing_model_retries_then_falls_back() {
        let model = ScriptedCompletion::failing();
        let processor = processor().with_completion_model(model.clone());
        let ctx = processor.process("法师职业介绍", None).await;

        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.translation, Translation::Skipped);
        assert_eq!(ctx.method, ProcessingMethod::Deterministic);
        assert_eq!(processor.stats().llm_failures, 1);
    }

    #[tokio::test]
    async fn test_cache_returns_identical_context() {
        let model = ScriptedCompletion::replying("{\"intent\": \"wiki\", \"confidence\": 0.9}");
        let processor = processor().with_completion_model(model.clone());

        let first = processor.process("charger", Some("helldiver2")).await;
        let second = processor.process("charger", Some("helldiver2")).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(processor.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_empty_query() {
        let ctx = processor().process("   ", None).await;
        assert_eq!(ctx.language, Language::Unknown);
        assert_eq!(ctx.intent, IntentLabel::General);
        assert_eq!(ctx.rewritten_text, "");
        assert_eq!(ctx.lexical_text, "");
    }

    #[test]
    fn test_config_validation() {
        assert!(QueryProcessingConfig::default().validate().unwrap().is_empty());

        let mut config = QueryProcessingConfig::default();
        config.rewrite.max_guidance_keywords = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_flattens_rewrite_settings() {
        let yaml = "cacheTtlSecs: 60\nmaxGuidanceKeywords: 2\n";
        let config: QueryProcessingConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.rewrite.max_guidance_keywords, 2);
        assert_eq!(config.rewrite.guidance_rules.len(), 3);
        assert!(config.use_llm);
    }
}
