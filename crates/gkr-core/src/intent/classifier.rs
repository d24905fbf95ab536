//! Deterministic intent scoring.
//!
//! The same rule scores both sides of retrieval: queries are classified with
//! it, and the reranker applies it to fragment metadata to measure how well a
//! fragment serves the query's intent.

use gkr_db::KnowledgeFragment;
use serde::Serialize;

use super::taxonomy::{IntentLabel, IntentProfile, IntentTaxonomy};
use crate::game::WeightedPhrase;
use crate::text::contains_term;

/// Outcome of classifying a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub label: IntentLabel,
    /// In [0, 1].
    pub confidence: f32,
    /// Raw score per label, in [`IntentLabel::ALL`] order.
    pub scores: Vec<(IntentLabel, f32)>,
}

impl IntentTaxonomy {
    /// Score `texts` against one profile.
    ///
    /// Every keyword, pattern and category phrase counts once if it matches
    /// any of the texts.
    pub fn score_profile(
        &self,
        profile: &IntentProfile,
        texts: &[&str],
        phrases: &[&WeightedPhrase],
    ) -> f32 {
        let matches_any = |needle: &str| texts.iter().any(|t| contains_term(t, needle));

        let keyword_hits = profile
            .keywords
            .iter()
            .filter(|k| matches_any(k.as_str()))
            .count();
        let phrase_hits = phrases
            .iter()
            .filter(|p| profile.phrase_categories.contains(&p.category))
            .filter(|p| matches_any(&p.phrase))
            .count();
        let pattern_hits = profile
            .patterns
            .iter()
            .filter(|re| texts.iter().any(|t| re.is_match(t)))
            .count();

        (keyword_hits + phrase_hits) as f32 * self.keyword_hit_weight
            + pattern_hits as f32 * self.pattern_hit_weight
    }

    /// Classify a query.
    ///
    /// The highest-scoring label wins with confidence `win / (win + runner_up)`.
    /// A tie at the top, including all zeros, yields [`IntentLabel::DEFAULT`];
    /// all zeros report confidence 0.5.
    pub fn classify(&self, texts: &[&str], phrases: &[&WeightedPhrase]) -> Classification {
        let scores: Vec<(IntentLabel, f32)> = self
            .profiles()
            .map(|p| (p.label, self.score_profile(p, texts, phrases)))
            .collect();

        let mut ranked: Vec<f32> = scores.iter().map(|(_, s)| *s).collect();
        ranked.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let win = ranked.first().copied().unwrap_or(0.0);
        let runner_up = ranked.get(1).copied().unwrap_or(0.0);

        let (label, confidence) = if win <= 0.0 {
            (IntentLabel::DEFAULT, 0.5)
        } else if win == runner_up {
            (IntentLabel::DEFAULT, 0.5)
        } else {
            let label = scores
                .iter()
                .find(|(_, s)| *s == win)
                .map(|(l, _)| *l)
                .unwrap_or(IntentLabel::DEFAULT);
            (label, (win / (win + runner_up)).clamp(0.0, 1.0))
        };

        tracing::debug!(
            intent = %label,
            confidence,
            ?scores,
            "Deterministic intent classification"
        );

        Classification {
            label,
            confidence,
            scores,
        }
    }

    /// How well a fragment serves `label`, in [0, 1].
    ///
    /// The query scoring rule applied to topic, summary and keywords, plus the
    /// content-type bonus when the fragment's tag is preferred by the intent.
    pub fn fragment_relevance(&self, label: IntentLabel, fragment: &KnowledgeFragment) -> f32 {
        let profile = self.profile(label);
        let keywords = fragment.keywords.join(" ");
        let texts = [
            fragment.topic.as_str(),
            fragment.summary.as_str(),
            keywords.as_str(),
        ];

        let mut score = self.score_profile(profile, &texts, &[]);
        if profile.prefers_content_type(&fragment.content_type) {
            score += self.content_type_bonus;
        }
        score.clamp(0.0, 1.0)
    }
}
