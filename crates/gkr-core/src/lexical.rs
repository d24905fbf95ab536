//! Weighted BM25 queries.
//!
//! The rewritten query is tokenized with the index tokenizer. Tokens that
//! belong to a game phrase found in the query take that phrase's weight, so
//! "bile titan" outweighs "kill" when ranking enemy fragments.

use std::collections::HashMap;

use crate::bm25::Tokenizer;
use crate::game::WeightedPhrase;
use crate::text::contains_term;

/// Tokens and their weights, in query order. Duplicates are kept; the index
/// sums their weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexicalQuery {
    terms: Vec<(String, f32)>,
}

impl LexicalQuery {
    /// Build a query from `text` and the phrases of the active game.
    pub fn build(text: &str, tokenizer: &Tokenizer, phrases: &[&WeightedPhrase]) -> Self {
        let mut boosts: HashMap<String, f32> = HashMap::new();
        for phrase in phrases.iter().filter(|p| contains_term(text, &p.phrase)) {
            for token in tokenizer.tokenize(&phrase.phrase) {
                let current = boosts.entry(token).or_insert(1.0);
                *current = current.max(phrase.weight);
            }
        }

        let terms = tokenizer
            .tokenize(text)
            .into_iter()
            .map(|token| {
                let weight = boosts.get(&token).copied().unwrap_or(1.0);
                (token, weight)
            })
            .collect();

        Self { terms }
    }

    pub fn terms(&self) -> &[(String, f32)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Summed weight of `token`, 0.0 when absent.
    pub fn weight_of(&self, token: &str) -> f32 {
        self.terms
            .iter()
            .filter(|(t, _)| t == token)
            .map(|(_, w)| w)
            .sum()
    }
}
