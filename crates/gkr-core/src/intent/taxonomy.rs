//! Intent labels, their trigger profiles and rerank weights.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::GkrError;
use crate::game::PhraseCategory;

// ============================================================================
// IntentLabel
// ============================================================================

/// What the player wants from the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentLabel {
    /// Facts: definitions, stats, item or enemy data.
    WikiLookup,
    /// Advice: how to beat something, what to build, what to pick next.
    StrategyGuide,
    /// Anything else. The default when classification is inconclusive.
    General,
}

impl IntentLabel {
    /// Every label, in tie-breaking order.
    pub const ALL: [IntentLabel; 3] = [Self::WikiLookup, Self::StrategyGuide, Self::General];

    /// Label used when nothing else wins.
    pub const DEFAULT: IntentLabel = Self::General;

    /// Short name used in logs, prompts and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WikiLookup => "wiki",
            Self::StrategyGuide => "guide",
            Self::General => "general",
        }
    }

    /// Parse a label produced by the completion model.
    ///
    /// Returns `None` for anything unrecognized, including "unknown".
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "wiki" | "wikilookup" | "wiki_lookup" => Some(Self::WikiLookup),
            "guide" | "strategy" | "strategyguide" | "strategy_guide" => Some(Self::StrategyGuide),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::WikiLookup => 0,
            Self::StrategyGuide => 1,
            Self::General => 2,
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Rerank weights for one intent. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightProfile {
    pub intent_weight: f32,
    pub semantic_weight: f32,
}

impl WeightProfile {
    pub const fn new(intent_weight: f32, semantic_weight: f32) -> Self {
        Self {
            intent_weight,
            semantic_weight,
        }
    }
}

/// Trigger profile for one intent as written in config.
///
/// A profile given in the config file replaces the built-in one entirely;
/// omitted lists are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentProfileConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Case-insensitive regular expressions.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Game phrase categories whose phrases count as keyword hits.
    #[serde(default)]
    pub phrase_categories: Vec<PhraseCategory>,
    /// Fragment content types this intent prefers.
    #[serde(default)]
    pub content_types: Vec<String>,
    pub weights: WeightProfile,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl IntentProfileConfig {
    /// Built-in profile for `label`.
    pub fn builtin(label: IntentLabel) -> Self {
        match label {
            IntentLabel::WikiLookup => Self {
                keywords: strings(&[
                    "是什么", "什么是", "介绍", "what is", "explain", "introduction", "info",
                    "stats", "数据", "属性", "overview",
                ]),
                patterns: strings(&[
                    r".*是什么",
                    r"什么是.*",
                    r"介绍一下.*",
                    r"what\s+is\s+",
                    r"explain\s+",
                ]),
                phrase_categories: Vec::new(),
                content_types: strings(&[
                    "explanation",
                    "introduction",
                    "overview",
                    "basic info",
                    "description",
                    "stats",
                ]),
                weights: WeightProfile::new(0.3, 0.7),
            },
            IntentLabel::StrategyGuide => Self {
                keywords: strings(&[
                    "how to", "how do", "best", "recommend", "should", "build", "guide",
                    "strategy", "tips", "kill", "beat", "defeat", "counter", "怎么", "如何",
                    "推荐", "攻略", "打法", "配装", "策略", "下一个", "选择",
                ]),
                patterns: strings(&[
                    r"(怎么|如何).*(打|击败|通关)",
                    r"how\s+to\s+(beat|defeat|kill)",
                    r"strategy\s+for",
                    r"(推荐|建议).*(选择|选哪个)",
                    r"which.*next",
                ]),
                phrase_categories: vec![PhraseCategory::Enemy, PhraseCategory::Tactical],
                content_types: strings(&[
                    "strategy",
                    "tactics",
                    "boss guide",
                    "enemy guide",
                    "how to beat",
                    "walkthrough",
                    "tips",
                    "build",
                    "build recommendation",
                ]),
                weights: WeightProfile::new(0.4, 0.6),
            },
            IntentLabel::General => Self {
                keywords: Vec::new(),
                patterns: Vec::new(),
                phrase_categories: Vec::new(),
                content_types: Vec::new(),
                weights: WeightProfile::new(0.2, 0.8),
            },
        }
    }
}

/// The whole taxonomy as written in config (`intents:`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyConfig {
    /// Score per keyword hit. Default: 0.3
    #[serde(default = "default_keyword_hit_weight")]
    pub keyword_hit_weight: f32,

    /// Score per pattern hit. Default: 0.5
    #[serde(default = "default_pattern_hit_weight")]
    pub pattern_hit_weight: f32,

    /// Fragment bonus for a preferred content type. Default: 0.5
    #[serde(default = "default_content_type_bonus")]
    pub content_type_bonus: f32,

    #[serde(default = "default_wiki")]
    pub wiki: IntentProfileConfig,

    #[serde(default = "default_guide")]
    pub guide: IntentProfileConfig,

    #[serde(default = "default_general")]
    pub general: IntentProfileConfig,
}

fn default_keyword_hit_weight() -> f32 {
    0.3
}

fn default_pattern_hit_weight() -> f32 {
    0.5
}

fn default_content_type_bonus() -> f32 {
    0.5
}

fn default_wiki() -> IntentProfileConfig {
    IntentProfileConfig::builtin(IntentLabel::WikiLookup)
}

fn default_guide() -> IntentProfileConfig {
    IntentProfileConfig::builtin(IntentLabel::StrategyGuide)
}

fn default_general() -> IntentProfileConfig {
    IntentProfileConfig::builtin(IntentLabel::General)
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            keyword_hit_weight: default_keyword_hit_weight(),
            pattern_hit_weight: default_pattern_hit_weight(),
            content_type_bonus: default_content_type_bonus(),
            wiki: default_wiki(),
            guide: default_guide(),
            general: default_general(),
        }
    }
}

impl TaxonomyConfig {
    fn profile(&self, label: IntentLabel) -> &IntentProfileConfig {
        match label {
            IntentLabel::WikiLookup => &self.wiki,
            IntentLabel::StrategyGuide => &self.guide,
            IntentLabel::General => &self.general,
        }
    }

    /// Validates the taxonomy, returning warnings for questionable values.
    ///
    /// # Errors
    /// - a hit weight or the content-type bonus is negative
    /// - a weight profile is outside [0,1] or does not sum to 1.0
    /// - a pattern is not a valid regular expression
    pub fn validate(&self) -> Result<Vec<String>, GkrError> {
        let mut warnings = Vec::new();

        for (name, value) in [
            ("keywordHitWeight", self.keyword_hit_weight),
            ("patternHitWeight", self.pattern_hit_weight),
            ("contentTypeBonus", self.content_type_bonus),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(GkrError::invalid_configuration(
                    format!("intents.{name} must be a non-negative number, got {value}"),
                    "Use the default (see documentation) or any value >= 0",
                ));
            }
        }

        for label in IntentLabel::ALL {
            let profile = self.profile(label);
            let w = profile.weights;
            let in_range = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
            if !in_range(w.intent_weight) || !in_range(w.semantic_weight) {
                return Err(GkrError::invalid_configuration(
                    format!("intents.{label}.weights must be within [0, 1]"),
                    "Set intentWeight and semanticWeight between 0.0 and 1.0",
                ));
            }
            if (w.intent_weight + w.semantic_weight - 1.0).abs() > 0.01 {
                return Err(GkrError::invalid_configuration(
                    format!(
                        "intents.{label}.weights sum to {} instead of 1.0",
                        w.intent_weight + w.semantic_weight
                    ),
                    "Make intentWeight + semanticWeight equal 1.0",
                ));
            }
            for pattern in &profile.patterns {
                compile_pattern(pattern)?;
            }
            if label != IntentLabel::DEFAULT
                && profile.keywords.is_empty()
                && profile.patterns.is_empty()
                && profile.phrase_categories.is_empty()
            {
                warnings.push(format!(
                    "intents.{label} has no keywords, patterns or phrase categories; it can never be selected"
                ));
            }
        }

        Ok(warnings)
    }
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, GkrError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            GkrError::invalid_configuration(
                format!("invalid intent pattern `{pattern}`: {e}"),
                "Fix the regular expression in the intents section",
            )
        })
}

// ============================================================================
// Compiled taxonomy
// ============================================================================

/// A profile ready for matching: lowercased keywords, compiled patterns.
#[derive(Debug, Clone)]
pub struct IntentProfile {
    pub label: IntentLabel,
    pub keywords: Vec<String>,
    pub patterns: Vec<Regex>,
    pub phrase_categories: Vec<PhraseCategory>,
    pub content_types: Vec<String>,
    pub weights: WeightProfile,
}

impl IntentProfile {
    fn compile(label: IntentLabel, config: &IntentProfileConfig) -> Result<Self, GkrError> {
        let patterns = config
            .patterns
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            label,
            keywords: config.keywords.iter().map(|k| k.to_lowercase()).collect(),
            patterns,
            phrase_categories: config.phrase_categories.clone(),
            content_types: config
                .content_types
                .iter()
                .map(|c| c.trim().to_lowercase())
                .collect(),
            weights: config.weights,
        })
    }

    /// Whether this profile prefers fragments tagged `content_type`.
    pub fn prefers_content_type(&self, content_type: &str) -> bool {
        let tag = content_type.trim().to_lowercase();
        !tag.is_empty() && self.content_types.iter().any(|c| *c == tag)
    }
}

/// Immutable, compiled intent taxonomy. Built once and shared.
#[derive(Debug, Clone)]
pub struct IntentTaxonomy {
    pub(crate) keyword_hit_weight: f32,
    pub(crate) pattern_hit_weight: f32,
    pub(crate) content_type_bonus: f32,
    profiles: [IntentProfile; 3],
}

impl IntentTaxonomy {
    /// Validate and compile a taxonomy config.
    pub fn new(config: &TaxonomyConfig) -> Result<Self, GkrError> {
        config.validate()?;
        Ok(Self {
            keyword_hit_weight: config.keyword_hit_weight,
            pattern_hit_weight: config.pattern_hit_weight,
            content_type_bonus: config.content_type_bonus,
            profiles: [
                IntentProfile::compile(IntentLabel::WikiLookup, &config.wiki)?,
                IntentProfile::compile(IntentLabel::StrategyGuide, &config.guide)?,
                IntentProfile::compile(IntentLabel::General, &config.general)?,
            ],
        })
    }

    /// The built-in taxonomy.
    pub fn builtin() -> Result<Self, GkrError> {
        Self::new(&TaxonomyConfig::default())
    }

    pub fn profile(&self, label: IntentLabel) -> &IntentProfile {
        &self.profiles[label.index()]
    }

    pub fn profiles(&self) -> impl Iterator<Item = &IntentProfile> {
        self.profiles.iter()
    }
}
