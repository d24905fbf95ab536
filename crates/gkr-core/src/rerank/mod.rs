//! Intent-aware reranking of fused hits.
//!
//! `final = intent_weight * intent_component + semantic_weight * semantic_component`
//!
//! Both components lie in [0, 1] and the weights sum to 1, so every final
//! score does too. The weights come from the query intent's profile and shift
//! toward the intent signal when the classification is confident.
//!
//! The intent component blends two signals: the fragment's relevance to the
//! query's taxonomy label, and its relevance to the query's sub-intent
//! ([`SubIntent`]), a finer focus such as "build" or "recommendation" found by
//! the reranker's own classifier.

use std::sync::Arc;

use gkr_db::{FragmentId, FragmentStore, KnowledgeFragment};
use serde::{Deserialize, Serialize};

use crate::errors::GkrError;
use crate::fusion::{FusedHit, FusionConfig};
use crate::intent::{IntentLabel, IntentTaxonomy, WeightProfile};
use crate::query::QueryContext;

mod sub_intent;

pub use sub_intent::{
    SubIntent, SubIntentClassifier, SubIntentConfig, SubIntentMatch, SubIntentProfileConfig,
};

// ============================================================================
// Configuration
// ============================================================================

/// Source of the semantic component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticSignal {
    /// Vector rank only: `(k + 1) / (k + vector_rank)`, 0 when absent.
    #[default]
    Vector,
    /// Total fusion score divided by the best reachable fusion score.
    Fusion,
}

/// Reranker configuration (`rerank:` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankConfig {
    /// When false, hits keep their fused order. Default: true
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Confidence above which the intent weight is boosted. Default: 0.7
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Weight moved from semantic to intent on a confident query. Default: 0.1
    #[serde(default = "default_confidence_delta")]
    pub confidence_delta: f32,

    #[serde(default)]
    pub semantic_signal: SemanticSignal,

    #[serde(default)]
    pub sub_intents: SubIntentConfig,
}

fn default_enabled() -> bool {
    true
}

fn default_confidence_threshold() -> f32 {
    0.7
}

fn default_confidence_delta() -> f32 {
    0.1
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: default_confidence_threshold(),
            confidence_delta: default_confidence_delta(),
            semantic_signal: SemanticSignal::default(),
            sub_intents: SubIntentConfig::default(),
        }
    }
}

impl RerankConfig {
    pub fn validate(&self) -> Result<Vec<String>, GkrError> {
        let mut warnings = Vec::new();
        let unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);

        if !unit(self.confidence_threshold) {
            return Err(GkrError::invalid_configuration(
                format!(
                    "rerank.confidenceThreshold must be within [0, 1], got {}",
                    self.confidence_threshold
                ),
                "Use a value like 0.7",
            ));
        }
        if !unit(self.confidence_delta) {
            return Err(GkrError::invalid_configuration(
                format!(
                    "rerank.confidenceDelta must be within [0, 1], got {}",
                    self.confidence_delta
                ),
                "Use a small value like 0.1",
            ));
        }
        if self.confidence_delta > 0.3 {
            warnings.push(format!(
                "rerank.confidenceDelta={} is large; confident queries will mostly ignore semantic similarity",
                self.confidence_delta
            ));
        }
        warnings.extend(self.sub_intents.validate()?);
        Ok(warnings)
    }
}

// ============================================================================
// Reranker
// ============================================================================

/// A hit after reranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankedHit {
    pub fragment_id: FragmentId,
    /// In [0, 1].
    pub final_score: f32,
    pub intent_component: f32,
    pub semantic_component: f32,
    pub fused: FusedHit,
}

/// Rescores fused hits with the query intent.
#[derive(Debug, Clone)]
pub struct IntentReranker {
    taxonomy: Arc<IntentTaxonomy>,
    sub_intents: SubIntentClassifier,
    fusion: FusionConfig,
    config: RerankConfig,
}

impl IntentReranker {
    pub fn new(
        taxonomy: Arc<IntentTaxonomy>,
        fusion: FusionConfig,
        config: RerankConfig,
    ) -> Result<Self, GkrError> {
        let sub_intents = SubIntentClassifier::new(
            &config.sub_intents,
            taxonomy.keyword_hit_weight,
            taxonomy.pattern_hit_weight,
        )?;
        Ok(Self {
            taxonomy,
            sub_intents,
            fusion,
            config,
        })
    }

    /// The sub-intent of `ctx`, read from the effective text and the raw text.
    pub fn sub_intent(&self, ctx: &QueryContext) -> SubIntentMatch {
        let effective = ctx.effective_text();
        let mut texts = vec![effective];
        if ctx.raw_text != effective {
            texts.push(ctx.raw_text.as_str());
        }
        self.sub_intents.classify(&texts)
    }

    /// General queries get 0. Otherwise the label relevance, blended with the
    /// sub-intent relevance when the query has a sub-intent.
    fn intent_component(
        &self,
        ctx: &QueryContext,
        sub_intent: SubIntent,
        fragment: &KnowledgeFragment,
    ) -> f32 {
        if ctx.intent == IntentLabel::General {
            return 0.0;
        }
        let primary = self.taxonomy.fragment_relevance(ctx.intent, fragment);
        if sub_intent == SubIntent::General {
            return primary;
        }
        let share = self.sub_intents.share();
        let secondary = self.sub_intents.relevance(sub_intent, fragment);
        ((1.0 - share) * primary + share * secondary).clamp(0.0, 1.0)
    }

    /// Weights used for `ctx`, after the confidence adjustment.
    pub fn weights_for(&self, ctx: &QueryContext) -> WeightProfile {
        if !self.config.enabled {
            return WeightProfile::new(0.0, 1.0);
        }

        let base = self.taxonomy.profile(ctx.intent).weights;
        if ctx.confidence <= self.config.confidence_threshold {
            return base;
        }

        let delta = self.config.confidence_delta;
        let intent = (base.intent_weight + delta).clamp(0.0, 1.0);
        let semantic = (base.semantic_weight - delta).clamp(0.0, 1.0);
        let sum = intent + semantic;
        if sum <= 0.0 {
            return base;
        }
        WeightProfile::new(intent / sum, semantic / sum)
    }

    fn semantic_component(&self, hit: &FusedHit) -> f32 {
        let signal = if self.config.enabled {
            self.config.semantic_signal
        } else {
            SemanticSignal::Fusion
        };
        let k = self.fusion.rrf_k;

        let value = match signal {
            SemanticSignal::Vector => match hit.vector_rank {
                Some(rank) => (k + 1.0) / (k + rank as f32),
                None => 0.0,
            },
            SemanticSignal::Fusion => {
                let max = self.fusion.max_score();
                if max > 0.0 {
                    hit.fusion_score / max
                } else {
                    0.0
                }
            }
        };
        value.clamp(0.0, 1.0)
    }

    /// Rerank `fused` for `ctx` and keep the best `top_k`.
    ///
    /// Hits whose fragment is missing from `fragments` are dropped with a
    /// warning. Equal final scores keep their fused order.
    pub fn rerank(
        &self,
        ctx: &QueryContext,
        fused: &[FusedHit],
        fragments: &FragmentStore,
        top_k: usize,
    ) -> Vec<RerankedHit> {
        let weights = self.weights_for(ctx);
        let sub_intent = self.sub_intent(ctx);

        let mut reranked: Vec<RerankedHit> = fused
            .iter()
            .filter_map(|hit| {
                let Some(fragment) = fragments.get(&hit.fragment_id) else {
                    tracing::warn!(
                        fragment_id = %hit.fragment_id,
                        "Fragment missing from side-table; dropping hit"
                    );
                    return None;
                };

                let intent_component = self.intent_component(ctx, sub_intent.kind, fragment);
                let semantic_component = self.semantic_component(hit);
                let final_score = (weights.intent_weight * intent_component
                    + weights.semantic_weight * semantic_component)
                    .clamp(0.0, 1.0);

                Some(RerankedHit {
                    fragment_id: hit.fragment_id.clone(),
                    final_score,
                    intent_component,
                    semantic_component,
                    fused: hit.clone(),
                })
            })
            .collect();

        reranked.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        reranked.truncate(top_k);

        tracing::debug!(
            intent = %ctx.intent,
            sub_intent = %sub_intent.kind,
            intent_weight = weights.intent_weight,
            semantic_weight = weights.semantic_weight,
            kept = reranked.len(),
            "Reranked fused hits"
        );
        reranked
    }
}
