//! Finer-grained query focus used by the reranker.
//!
//! The taxonomy answers "wiki, guide or general". Within a guide question the
//! player may still want a recommendation, a build, a comparison or an unlock
//! path, and the fragments that serve each differ. [`SubIntentClassifier`]
//! scores the query against configured [`SubIntentProfileConfig`]s with the
//! same keyword and pattern rule the taxonomy uses, then rates fragments
//! against the winning profile's content types and boost terms.

use std::collections::HashSet;
use std::fmt;

use gkr_db::KnowledgeFragment;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::GkrError;
use crate::intent::compile_pattern;
use crate::text::contains_term;

/// What the player is after within their question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubIntent {
    Recommendation,
    Explanation,
    Strategy,
    Comparison,
    Build,
    Unlock,
    /// No profile matched.
    General,
}

impl SubIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubIntent::Recommendation => "recommendation",
            SubIntent::Explanation => "explanation",
            SubIntent::Strategy => "strategy",
            SubIntent::Comparison => "comparison",
            SubIntent::Build => "build",
            SubIntent::Unlock => "unlock",
            SubIntent::General => "general",
        }
    }
}

impl fmt::Display for SubIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// One sub-intent as written in config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubIntentProfileConfig {
    pub kind: SubIntent,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Case-insensitive regular expressions.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Multiplier on the keyword and pattern hits. Default: 1.0
    #[serde(default = "default_profile_weight")]
    pub weight: f32,
    /// Fragment content types that serve this sub-intent.
    #[serde(default)]
    pub content_types: Vec<String>,
    /// Terms in a fragment's topic or summary that earn `boost`.
    #[serde(default)]
    pub boost_terms: Vec<String>,
    #[serde(default)]
    pub boost: f32,
}

fn default_profile_weight() -> f32 {
    1.0
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SubIntentProfileConfig {
    /// The built-in profiles, in tie-break order.
    pub fn builtin_all() -> Vec<Self> {
        vec![
            Self {
                kind: SubIntent::Recommendation,
                keywords: strings(&[
                    "推荐", "选择", "选哪个", "下一个", "下个", "应该", "最好", "最强",
                    "recommend", "choice", "next", "should", "best", "which",
                ]),
                patterns: strings(&[
                    r"(推荐|建议).*(选择|选哪个)",
                    r"下[一个]?.*选",
                    r"(解锁|买)了.*下[一个]?",
                    r"which.*next",
                    r"what.*after",
                    r"recommend.*after",
                ]),
                weight: 1.5,
                content_types: strings(&[
                    "recommendation",
                    "warbond recommendation",
                    "build recommendation",
                    "weapon recommendation",
                    "priority",
                    "tier list",
                    "best choice",
                ]),
                boost_terms: strings(&["recommendation", "推荐", "priority", "优先", "tier", "best", "top"]),
                boost: 0.4,
            },
            Self {
                kind: SubIntent::Explanation,
                keywords: strings(&["是什么", "什么是", "介绍", "explain", "what is", "introduction"]),
                patterns: strings(&[r".*是什么", r"什么是.*", r"介绍一下.*", r"what\s+is\s+", r"explain\s+"]),
                weight: 1.2,
                content_types: strings(&[
                    "explanation",
                    "introduction",
                    "overview",
                    "basic info",
                    "what is",
                    "description",
                    "guide introduction",
                ]),
                boost_terms: strings(&["explained", "解释", "introduction", "介绍", "what is", "overview"]),
                boost: 0.3,
            },
            Self {
                kind: SubIntent::Strategy,
                keywords: strings(&["怎么打", "如何击败", "攻略", "打法", "strategy", "how to beat", "defeat", "kill"]),
                patterns: strings(&[
                    r"(怎么|如何).*(打|击败|通关)",
                    r".*攻略",
                    r"how\s+to\s+(beat|defeat|kill)",
                    r"strategy\s+for",
                ]),
                weight: 1.3,
                content_types: strings(&[
                    "strategy",
                    "tactics",
                    "boss guide",
                    "enemy guide",
                    "how to beat",
                    "walkthrough",
                    "tips",
                ]),
                boost_terms: strings(&["guide", "攻略", "strategy", "tactics", "tips", "weak point"]),
                boost: 0.3,
            },
            Self {
                kind: SubIntent::Comparison,
                keywords: strings(&["哪个好", "哪个更", "对比", "比较", "区别", "which better", "compare", "difference", "vs"]),
                patterns: strings(&[
                    r"哪个.*(好|强|优)",
                    r"对比|比较",
                    r".*区别",
                    r"which.*better",
                    r"\bvs\b",
                    r"compare\s+",
                ]),
                weight: 1.4,
                content_types: strings(&[
                    "comparison",
                    "versus",
                    "difference",
                    "pros and cons",
                    "which is better",
                    "analysis",
                ]),
                boost_terms: Vec::new(),
                boost: 0.0,
            },
            Self {
                kind: SubIntent::Build,
                keywords: strings(&["配装", "装备", "搭配", "build", "loadout", "equipment"]),
                patterns: strings(&[r".*配装", r"装备.*搭配", r".*build", r"loadout\s+for"]),
                weight: 1.3,
                content_types: strings(&[
                    "build guide",
                    "loadout",
                    "equipment setup",
                    "gear recommendation",
                    "build recommendation",
                    "optimal build",
                ]),
                boost_terms: strings(&["build", "loadout", "配装"]),
                boost: 0.3,
            },
            Self {
                kind: SubIntent::Unlock,
                keywords: strings(&["解锁", "获得", "获取", "unlock", "obtain", "get"]),
                patterns: strings(&[
                    r"(如何|怎么).*(解锁|获得)",
                    r".*解锁条件",
                    r"how\s+to\s+(unlock|get|obtain)",
                    r"unlock\s+requirements?",
                ]),
                weight: 1.2,
                content_types: strings(&[
                    "unlock guide",
                    "how to unlock",
                    "requirements",
                    "prerequisites",
                    "unlock conditions",
                    "acquisition",
                ]),
                boost_terms: Vec::new(),
                boost: 0.0,
            },
        ]
    }
}

/// Sub-intent settings (`rerank.subIntents:` in the config file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubIntentConfig {
    /// Share of the intent component taken by the sub-intent relevance.
    /// 0 turns the sub-intent signal off. Default: 0.5
    #[serde(default = "default_share")]
    pub share: f32,

    /// Relevance earned once when the fragment's tag or topic names one of
    /// the sub-intent's content types. Default: 0.5
    #[serde(default = "default_type_match_score")]
    pub type_match_score: f32,

    /// Relevance per content type, scaled by the fraction of its words found
    /// in the fragment's keywords. Default: 0.3
    #[serde(default = "default_keyword_match_score")]
    pub keyword_match_score: f32,

    /// Replaces the built-in profiles entirely when given.
    #[serde(default = "SubIntentProfileConfig::builtin_all")]
    pub profiles: Vec<SubIntentProfileConfig>,
}

fn default_share() -> f32 {
    0.5
}

fn default_type_match_score() -> f32 {
    0.5
}

fn default_keyword_match_score() -> f32 {
    0.3
}

impl Default for SubIntentConfig {
    fn default() -> Self {
        Self {
            share: default_share(),
            type_match_score: default_type_match_score(),
            keyword_match_score: default_keyword_match_score(),
            profiles: SubIntentProfileConfig::builtin_all(),
        }
    }
}

impl SubIntentConfig {
    pub fn validate(&self) -> Result<Vec<String>, GkrError> {
        let mut warnings = Vec::new();
        let unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);

        for (name, value) in [
            ("share", self.share),
            ("typeMatchScore", self.type_match_score),
            ("keywordMatchScore", self.keyword_match_score),
        ] {
            if !unit(value) {
                return Err(GkrError::invalid_configuration(
                    format!("rerank.subIntents.{name} must be within [0, 1], got {value}"),
                    "Use a value between 0 and 1",
                ));
            }
        }

        let mut seen = HashSet::new();
        for profile in &self.profiles {
            let kind = profile.kind;
            if kind == SubIntent::General {
                return Err(GkrError::invalid_configuration(
                    "rerank.subIntents.profiles must not define `general`",
                    "`general` is the fallback when no profile matches; remove that entry",
                ));
            }
            if !seen.insert(kind) {
                return Err(GkrError::invalid_configuration(
                    format!("rerank.subIntents.profiles defines `{kind}` twice"),
                    "Merge the duplicate entries",
                ));
            }
            if !profile.weight.is_finite() || profile.weight < 0.0 {
                return Err(GkrError::invalid_configuration(
                    format!("rerank.subIntents `{kind}` weight must be >= 0, got {}", profile.weight),
                    "Use a multiplier like 1.3",
                ));
            }
            if !unit(profile.boost) {
                return Err(GkrError::invalid_configuration(
                    format!("rerank.subIntents `{kind}` boost must be within [0, 1], got {}", profile.boost),
                    "Use a small value like 0.3",
                ));
            }
            for pattern in &profile.patterns {
                compile_pattern(pattern)?;
            }
            if profile.keywords.is_empty() && profile.patterns.is_empty() {
                warnings.push(format!(
                    "rerank.subIntents `{kind}` has no keywords or patterns; it can never be selected"
                ));
            }
        }

        Ok(warnings)
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// The winning sub-intent for a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubIntentMatch {
    pub kind: SubIntent,
    /// In [0, 1].
    pub confidence: f32,
}

impl SubIntentMatch {
    pub const GENERAL: SubIntentMatch = SubIntentMatch {
        kind: SubIntent::General,
        confidence: 0.5,
    };
}

#[derive(Debug, Clone)]
struct SubIntentProfile {
    kind: SubIntent,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
    weight: f32,
    content_types: Vec<String>,
    boost_terms: Vec<String>,
    boost: f32,
}

/// Compiled sub-intent profiles.
#[derive(Debug, Clone)]
pub struct SubIntentClassifier {
    share: f32,
    type_match_score: f32,
    keyword_match_score: f32,
    keyword_hit_weight: f32,
    pattern_hit_weight: f32,
    profiles: Vec<SubIntentProfile>,
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl SubIntentClassifier {
    /// Compile `config`. Query hits are scored with the taxonomy's keyword and
    /// pattern hit weights.
    pub fn new(
        config: &SubIntentConfig,
        keyword_hit_weight: f32,
        pattern_hit_weight: f32,
    ) -> Result<Self, GkrError> {
        config.validate()?;
        let profiles = config
            .profiles
            .iter()
            .map(|p| {
                Ok(SubIntentProfile {
                    kind: p.kind,
                    keywords: lowercase_all(&p.keywords),
                    patterns: p
                        .patterns
                        .iter()
                        .map(|pattern| compile_pattern(pattern))
                        .collect::<Result<Vec<_>, GkrError>>()?,
                    weight: p.weight,
                    content_types: lowercase_all(&p.content_types),
                    boost_terms: lowercase_all(&p.boost_terms),
                    boost: p.boost,
                })
            })
            .collect::<Result<Vec<_>, GkrError>>()?;

        Ok(Self {
            share: config.share,
            type_match_score: config.type_match_score,
            keyword_match_score: config.keyword_match_score,
            keyword_hit_weight,
            pattern_hit_weight,
            profiles,
        })
    }

    /// Share of the intent component taken by the sub-intent relevance.
    pub fn share(&self) -> f32 {
        self.share
    }

    fn score(&self, profile: &SubIntentProfile, texts: &[&str]) -> f32 {
        let keyword_hits = profile
            .keywords
            .iter()
            .filter(|k| texts.iter().any(|t| contains_term(t, k)))
            .count();
        let pattern_hit = profile
            .patterns
            .iter()
            .any(|p| texts.iter().any(|t| p.is_match(t)));

        let mut score = keyword_hits as f32 * self.keyword_hit_weight;
        if pattern_hit {
            score += self.pattern_hit_weight;
        }
        score * profile.weight
    }

    /// The best-scoring sub-intent over `texts`.
    ///
    /// The first profile wins a tie. No hits at all yields
    /// [`SubIntentMatch::GENERAL`]; otherwise confidence is half the winning
    /// score, capped at 1.
    pub fn classify(&self, texts: &[&str]) -> SubIntentMatch {
        let mut best: Option<(SubIntent, f32)> = None;
        for profile in &self.profiles {
            let score = self.score(profile, texts);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((profile.kind, score));
            }
        }

        match best {
            Some((kind, score)) => SubIntentMatch {
                kind,
                confidence: (score / 2.0).min(1.0),
            },
            None => SubIntentMatch::GENERAL,
        }
    }

    /// How well `fragment` serves `kind`, in [0, 1]. Always 0 for
    /// [`SubIntent::General`] or a kind with no profile.
    pub fn relevance(&self, kind: SubIntent, fragment: &KnowledgeFragment) -> f32 {
        let Some(profile) = self.profiles.iter().find(|p| p.kind == kind) else {
            return 0.0;
        };

        let tag = fragment.content_type.trim().to_lowercase();
        let mut score = 0.0;

        let type_match = profile
            .content_types
            .iter()
            .any(|t| *t == tag || contains_term(&fragment.topic, t));
        if type_match {
            score += self.type_match_score;
        }

        let keywords = lowercase_all(&fragment.keywords);
        if !keywords.is_empty() {
            for content_type in &profile.content_types {
                let words: Vec<&str> = content_type.split_whitespace().collect();
                let matching = words
                    .iter()
                    .filter(|w| keywords.iter().any(|k| contains_term(k, w)))
                    .count();
                if matching > 0 {
                    score += self.keyword_match_score * matching as f32 / words.len() as f32;
                }
            }
        }

        let boosted = profile
            .boost_terms
            .iter()
            .any(|b| contains_term(&fragment.topic, b) || contains_term(&fragment.summary, b));
        if boosted {
            score += profile.boost;
        }

        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SubIntentClassifier {
        SubIntentClassifier::new(&SubIntentConfig::default(), 0.3, 0.5).unwrap()
    }

    #[test]
    fn test_builtin_config_is_valid() {
        assert!(SubIntentConfig::default().validate().unwrap().is_empty());
    }

    #[test]
    fn test_build_query() {
        let m = classifier().classify(&["best build for terminids"]);
        assert_eq!(m.kind, SubIntent::Build);
        // "build" keyword plus the `.*build` pattern, times 1.3
        assert!((m.confidence - (0.3 + 0.5) * 1.3 / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_recommendation_and_unlock_queries() {
        let c = classifier();
        assert_eq!(
            c.classify(&["which warbond should I unlock next"]).kind,
            SubIntent::Recommendation
        );
        assert_eq!(c.classify(&["如何解锁轨道炮"]).kind, SubIntent::Unlock);
        assert_eq!(c.classify(&["how to kill bile titan"]).kind, SubIntent::Strategy);
    }

    #[test]
    fn test_no_hits_is_general() {
        let m = classifier().classify(&["bile titan"]);
        assert_eq!(m, SubIntentMatch::GENERAL);
        // "vs" must stand alone
        assert_eq!(classifier().classify(&["canvas"]).kind, SubIntent::General);
    }

    #[test]
    fn test_relevance_rules() {
        let c = classifier();
        let tagged = KnowledgeFragment::new("b", "Terminid build", "Bring an autocannon.")
            .with_content_type("Build Recommendation");
        // Type match plus the "build" boost
        assert!((c.relevance(SubIntent::Build, &tagged) - 0.8).abs() < 1e-5);

        let keyed = KnowledgeFragment::new("k", "Autocannon", "Versatile support weapon.")
            .with_keywords(["loadout"]);
        // Only the one-word "loadout" type matches a keyword
        assert!((c.relevance(SubIntent::Build, &keyed) - 0.3).abs() < 1e-5);

        assert_eq!(c.relevance(SubIntent::General, &tagged), 0.0);
        assert_eq!(c.relevance(SubIntent::Unlock, &tagged), 0.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SubIntentConfig::default();
        config.share = 1.5;
        assert!(config.validate().is_err());

        let mut config = SubIntentConfig::default();
        config.profiles.push(config.profiles[0].clone());
        assert!(config.validate().unwrap_err().to_string().contains("twice"));

        let mut config = SubIntentConfig::default();
        config.profiles[1].patterns.push("(unclosed".to_string());
        assert!(SubIntentClassifier::new(&config, 0.3, 0.5).is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_builtin_profiles() {
        let config: SubIntentConfig = serde_yaml::from_str("share: 0.25\n").unwrap();
        assert_eq!(config.share, 0.25);
        assert_eq!(config.profiles, SubIntentProfileConfig::builtin_all());
    }
}
