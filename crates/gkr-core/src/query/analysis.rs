//! One-call query analysis through the completion model.
//!
//! A single prompt asks for language, translation, intent and a rewrite at
//! once. The reply is JSON, possibly wrapped in a Markdown code fence.

use serde::Deserialize;

use crate::intent::IntentLabel;

/// Parsed completion reply. Every field is optional; missing or malformed
/// values fall back to the deterministic path field by field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmAnalysis {
    pub detected_language: Option<String>,
    pub translated_query: Option<String>,
    pub intent: Option<String>,
    pub confidence: Option<f32>,
    pub rewritten_query: Option<String>,
    pub bm25_optimized_query: Option<String>,
    pub reasoning: Option<String>,
}

impl LlmAnalysis {
    /// The intent label, if the model returned one we recognize.
    pub fn intent_label(&self) -> Option<IntentLabel> {
        self.intent.as_deref().and_then(IntentLabel::from_model_label)
    }

    /// Model confidence clamped to [0, 1]; 0.7 when absent or not finite.
    pub fn confidence(&self) -> f32 {
        match self.confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            _ => 0.7,
        }
    }

    pub fn translation(&self) -> Option<&str> {
        non_empty(self.translated_query.as_deref())
    }

    pub fn rewrite(&self) -> Option<&str> {
        non_empty(self.rewritten_query.as_deref())
    }

    pub fn lexical_rewrite(&self) -> Option<&str> {
        non_empty(self.bm25_optimized_query.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Build the analysis prompt for `query`.
pub fn build_analysis_prompt(query: &str) -> String {
    format!(
        r#"You analyze search queries for a game wiki and strategy guide assistant.

Query: "{query}"

Reply with a single JSON object and nothing else:
{{
    "detected_language": "zh|en|other",
    "translated_query": "English translation if the query is not English, otherwise the query unchanged",
    "intent": "wiki|guide|unknown",
    "confidence": 0.0,
    "rewritten_query": "the query optimized for semantic search",
    "bm25_optimized_query": "the query's key terms for keyword search, in English",
    "reasoning": "one sentence"
}}

Language: "zh" when more than 30% of the characters are Chinese ideographs.

Intent:
- wiki: facts, definitions, stats, or data about a specific item, character or enemy.
  Short queries of one or two words naming a game term are wiki.
- guide: strategies, recommendations, builds, loadouts, progression order,
  "what next", or how-to instructions.
- unknown: anything else.

Rewriting:
- Keep the meaning and scope of the query. Never replace game terms.
- Do not add a game name that the query does not mention.
- For strategy questions add words such as "strategy" or "guide".
- For recommendation questions add "best" or "recommendation".
- bm25_optimized_query keeps only the game terms and content words of the
  query. Do not add generic words like "guide" or "strategy"."#
    )
}

/// Remove a surrounding ```json / ``` fence, if any.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a completion reply into an [`LlmAnalysis`].
pub fn parse_analysis(reply: &str) -> Result<LlmAnalysis, serde_json::Error> {
    serde_json::from_str(strip_code_fences(reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"detected_language\": \"zh\", \"translated_query\": \"mage class introduction\", \"intent\": \"wiki\", \"confidence\": 0.9, \"rewritten_query\": \"mage class overview\"}\n```";
        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.translation(), Some("mage class introduction"));
        assert_eq!(analysis.intent_label(), Some(IntentLabel::WikiLookup));
        assert!((analysis.confidence() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_parse_plain_and_bare_fence() {
        assert!(parse_analysis("{\"intent\": \"guide\"}").is_ok());
        let analysis = parse_analysis("```\n{\"intent\": \"guide\"}\n```").unwrap();
        assert_eq!(analysis.intent_label(), Some(IntentLabel::StrategyGuide));
        assert_eq!(analysis.confidence(), 0.7);
    }

    #[test]
    fn test_unknown_intent_and_extra_fields() {
        let analysis =
            parse_analysis("{\"intent\": \"unknown\", \"search_type\": \"hybrid\", \"confidence\": 3}")
                .unwrap();
        assert_eq!(analysis.intent_label(), None);
        assert_eq!(analysis.confidence(), 1.0);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse_analysis("I think this is a guide query").is_err());
    }

    #[test]
    fn test_blank_fields_ignored() {
        let analysis = parse_analysis("{\"translated_query\": \"  \", \"rewritten_query\": \"\"}").unwrap();
        assert_eq!(analysis.translation(), None);
        assert_eq!(analysis.rewrite(), None);
        assert_eq!(analysis.lexical_rewrite(), None);
    }

    #[test]
    fn test_lexical_rewrite_read_separately() {
        let reply = "{\"rewritten_query\": \"bile titan strategy guide\", \"bm25_optimized_query\": \" bile titan weak point \"}";
        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.rewrite(), Some("bile titan strategy guide"));
        assert_eq!(analysis.lexical_rewrite(), Some("bile titan weak point"));
    }

    #[test]
    fn test_prompt_embeds_query() {
        let prompt = build_analysis_prompt("法师职业介绍");
        assert!(prompt.contains("Query: \"法师职业介绍\""));
        assert!(prompt.contains("\"intent\": \"wiki|guide|unknown\""));
    }
}
