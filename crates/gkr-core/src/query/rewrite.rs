//! Deterministic query rewriting.
//!
//! Guide-like queries get a few guidance keywords appended from a rule table
//! (`queryProcessing.guidanceRules`) plus the active game's name. Other
//! intents pass through unchanged.

use serde::{Deserialize, Serialize};

use crate::intent::IntentLabel;
use crate::text::{contains_term, normalize_whitespace};

/// One rewriting rule: when any trigger appears in the query, its keywords
/// are candidates for appending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceRule {
    pub triggers: Vec<String>,
    pub keywords: Vec<String>,
}

impl GuidanceRule {
    fn new(triggers: &[&str], keywords: &[&str]) -> Self {
        Self {
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn matches(&self, texts: &[&str]) -> bool {
        self.triggers
            .iter()
            .any(|trigger| texts.iter().any(|t| contains_term(t, trigger)))
    }

    /// Built-in rules: recommendation, strategy, loadout.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::new(
                &["推荐", "选择", "recommend", "choice", "next", "下一个"],
                &["guide", "recommendation"],
            ),
            Self::new(
                &["怎么", "如何", "how to", "strategy", "攻略"],
                &["strategy", "guide"],
            ),
            Self::new(
                &["build", "setup", "loadout", "配装", "搭配"],
                &["loadout", "setup"],
            ),
        ]
    }
}

/// Rewriting settings (part of `queryProcessing`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteConfig {
    /// Evaluated in order; keywords of every matching rule are collected.
    #[serde(default = "GuidanceRule::builtin")]
    pub guidance_rules: Vec<GuidanceRule>,

    /// Keywords used when no rule matches.
    #[serde(default = "default_guidance")]
    pub default_guidance: Vec<String>,

    /// Upper bound on appended keywords. Default: 3
    #[serde(default = "default_max_guidance_keywords")]
    pub max_guidance_keywords: usize,
}

fn default_guidance() -> Vec<String> {
    vec!["strategy".to_string(), "guide".to_string()]
}

fn default_max_guidance_keywords() -> usize {
    3
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            guidance_rules: GuidanceRule::builtin(),
            default_guidance: default_guidance(),
            max_guidance_keywords: default_max_guidance_keywords(),
        }
    }
}

impl RewriteConfig {
    /// Guidance keywords to append to `text`.
    ///
    /// Triggers are matched against every entry of `trigger_texts` (the
    /// translated and the raw query). Keywords already present in `text`
    /// are skipped and duplicates collapse. When every keyword of the
    /// matching rules is already present, the default guidance and then the
    /// remaining rules supply a single keyword, so a guide query always gains
    /// one unless the whole table is already in the text.
    pub fn guidance_keywords(&self, text: &str, trigger_texts: &[&str]) -> Vec<String> {
        let (matched, unmatched): (Vec<&GuidanceRule>, Vec<&GuidanceRule>) = self
            .guidance_rules
            .iter()
            .partition(|rule| rule.matches(trigger_texts));

        let primary: Vec<&String> = if matched.is_empty() {
            self.default_guidance.iter().collect()
        } else {
            matched.iter().flat_map(|r| r.keywords.iter()).collect()
        };

        let out = self.collect_new(text, primary, self.max_guidance_keywords);
        if !out.is_empty() || self.max_guidance_keywords == 0 {
            return out;
        }

        let fallback = self
            .default_guidance
            .iter()
            .chain(unmatched.iter().flat_map(|r| r.keywords.iter()));
        let out = self.collect_new(text, fallback, 1);
        if out.is_empty() {
            tracing::warn!(
                query = text,
                "Every guidance keyword is already in the query; rewrite adds none"
            );
        }
        out
    }

    fn collect_new<'a>(
        &self,
        text: &str,
        candidates: impl IntoIterator<Item = &'a String>,
        limit: usize,
    ) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for keyword in candidates {
            if out.len() >= limit {
                break;
            }
            let keyword = keyword.trim();
            if keyword.is_empty()
                || contains_term(text, keyword)
                || out.iter().any(|k| k.eq_ignore_ascii_case(keyword))
            {
                continue;
            }
            out.push(keyword.to_string());
        }
        out
    }

    /// Deterministic rewrite of `text` for `intent`.
    pub fn rewrite(
        &self,
        intent: IntentLabel,
        text: &str,
        trigger_texts: &[&str],
        game_name: Option<&str>,
    ) -> String {
        let text = normalize_whitespace(text);
        match intent {
            IntentLabel::WikiLookup | IntentLabel::General => text,
            IntentLabel::StrategyGuide => {
                let mut rewritten = text.clone();
                for keyword in self.guidance_keywords(&text, trigger_texts) {
                    rewritten.push(' ');
                    rewritten.push_str(&keyword);
                }
                ensure_game_name(&rewritten, game_name)
            }
        }
    }
}

/// Append `game_name` unless it is already mentioned.
pub fn ensure_game_name(text: &str, game_name: Option<&str>) -> String {
    let text = normalize_whitespace(text);
    match game_name.map(str::trim) {
        Some(name) if !name.is_empty() && !contains_term(&text, name) => {
            if text.is_empty() {
                name.to_string()
            } else {
                format!("{text} {name}")
            }
        }
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_rule() {
        let config = RewriteConfig::default();
        let q = "how to kill bile titan";
        let out = config.rewrite(IntentLabel::StrategyGuide, q, &[q], Some("Helldivers 2"));
        assert_eq!(out, "how to kill bile titan strategy guide Helldivers 2");
    }

    #[test]
    fn test_existing_keywords_skipped() {
        let config = RewriteConfig::default();
        let q = "charger strategy Helldivers 2";
        let out = config.rewrite(IntentLabel::StrategyGuide, q, &[q], Some("Helldivers 2"));
        assert_eq!(out, "charger strategy Helldivers 2 guide");
    }

    #[test]
    fn test_cjk_triggers_match_raw_text() {
        let config = RewriteConfig::default();
        let translated = "which class should I pick";
        let keywords = config.guidance_keywords(translated, &[translated, "推荐职业选择"]);
        assert_eq!(keywords, vec!["guide", "recommendation"]);
    }

    #[test]
    fn test_multiple_rules_capped() {
        let config = RewriteConfig::default();
        let q = "recommend a loadout, how to setup";
        let keywords = config.guidance_keywords(q, &[q]);
        // guide, recommendation, strategy, ... capped at 3 (loadout/setup already present)
        assert_eq!(keywords, vec!["guide", "recommendation", "strategy"]);
    }

    #[test]
    fn test_saturated_rule_falls_back_to_other_keywords() {
        let config = RewriteConfig::default();
        let q = "charger strategy guide";
        let out = config.rewrite(IntentLabel::StrategyGuide, q, &[q], None);
        assert_ne!(out, q);
        // Default guidance is also present, so the first unmatched rule fills in
        assert_eq!(out, "charger strategy guide recommendation");
    }

    #[test]
    fn test_every_keyword_present_adds_nothing() {
        let config = RewriteConfig {
            guidance_rules: vec![GuidanceRule::new(&["boss"], &["tips"])],
            default_guidance: vec!["guide".to_string()],
            max_guidance_keywords: 3,
        };
        let q = "boss tips guide";
        assert!(config.guidance_keywords(q, &[q]).is_empty());
    }

    #[test]
    fn test_default_guidance_when_no_rule_matches() {
        let config = RewriteConfig::default();
        let q = "kill bile titan";
        let out = config.rewrite(IntentLabel::StrategyGuide, q, &[q], None);
        assert_eq!(out, "kill bile titan strategy guide");
    }

    #[test]
    fn test_wiki_and_general_unchanged() {
        let config = RewriteConfig::default();
        let q = "what is  a charger";
        assert_eq!(
            config.rewrite(IntentLabel::WikiLookup, q, &[q], Some("Helldivers 2")),
            "what is a charger"
        );
        assert_eq!(
            config.rewrite(IntentLabel::General, "charger", &["charger"], Some("Helldivers 2")),
            "charger"
        );
    }

    #[test]
    fn test_ensure_game_name() {
        assert_eq!(ensure_game_name("best build", Some("Elden Ring")), "best build Elden Ring");
        assert_eq!(ensure_game_name("elden ring best build", Some("Elden Ring")), "elden ring best build");
        assert_eq!(ensure_game_name("best build", None), "best build");
    }

    #[test]
    fn test_rules_from_yaml() {
        let yaml = "guidanceRules:\n  - triggers: [boss]\n    keywords: [weak points]\nmaxGuidanceKeywords: 1\n";
        let config: RewriteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.guidance_keywords("boss fight", &["boss fight"]), vec!["weak points"]);
        assert_eq!(config.default_guidance, vec!["strategy", "guide"]);
    }
}
