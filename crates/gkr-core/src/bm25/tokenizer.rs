//! Unicode-aware tokenizer with stemming for BM25.
//!
//! Provides text preprocessing for BM25 indexing:
//! - Unicode word segmentation
//! - Case folding (lowercasing)
//! - Porter stemming (English)
//! - Stop word removal
//! - CJK runs split into character unigrams plus adjacent bigrams

use bincode::{Decode, Encode};
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Tokenizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct TokenizerConfig {
    /// Apply Porter stemming to Latin-script tokens.
    pub stemming: bool,
    /// Remove common stop words.
    pub remove_stopwords: bool,
    /// Minimum token length (bytes) for Latin-script tokens.
    pub min_token_length: usize,
    /// Emit bigrams for adjacent CJK characters.
    pub cjk_bigrams: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            stemming: true,
            remove_stopwords: true,
            min_token_length: 2,
            cjk_bigrams: true,
        }
    }
}

/// Whether `c` is a CJK Unified Ideograph.
pub fn is_cjk(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Unicode-aware tokenizer with optional stemming.
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<&'static str>,
}

impl Tokenizer {
    /// Create a new tokenizer with the given configuration.
    pub fn new(config: TokenizerConfig) -> Self {
        let stemmer = if config.stemming {
            Some(Stemmer::create(Algorithm::English))
        } else {
            None
        };

        Self {
            config,
            stemmer,
            stopwords: Self::default_stopwords(),
        }
    }

    /// Tokenize text into a vector of processed tokens.
    ///
    /// Latin-script words go through lowercase, length filter, stop words and
    /// stemming. Consecutive CJK characters (across segmenter boundaries, but
    /// not across gaps) form a run that yields every character plus every
    /// adjacent pair.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut run: Vec<char> = Vec::new();
        let mut run_end = 0usize;

        for (offset, word) in text.unicode_word_indices() {
            if !word.is_empty() && word.chars().all(is_cjk) {
                if !run.is_empty() && offset != run_end {
                    self.flush_cjk_run(&mut run, &mut tokens);
                }
                run.extend(word.chars());
                run_end = offset + word.len();
                continue;
            }

            self.flush_cjk_run(&mut run, &mut tokens);
            if let Some(token) = self.process_token(word) {
                tokens.push(token);
            }
        }
        self.flush_cjk_run(&mut run, &mut tokens);

        tokens
    }

    /// Tokenize and return term frequencies.
    pub fn tokenize_with_tf(&self, text: &str) -> Vec<(String, usize)> {
        use std::collections::HashMap;

        let mut tf: HashMap<String, usize> = HashMap::new();
        for token in self.tokenize(text) {
            *tf.entry(token).or_insert(0) += 1;
        }

        tf.into_iter().collect()
    }

    fn flush_cjk_run(&self, run: &mut Vec<char>, tokens: &mut Vec<String>) {
        if run.is_empty() {
            return;
        }
        for (i, c) in run.iter().enumerate() {
            let mut buf = [0u8; 4];
            let unigram: &str = c.encode_utf8(&mut buf);
            if !(self.config.remove_stopwords && self.stopwords.contains(unigram)) {
                tokens.push(unigram.to_string());
            }
            if self.config.cjk_bigrams {
                if let Some(next) = run.get(i + 1) {
                    tokens.push([*c, *next].iter().collect());
                }
            }
        }
        run.clear();
    }

    /// Process a single Latin-script token through the pipeline.
    fn process_token(&self, word: &str) -> Option<String> {
        let lower = word.to_lowercase();

        // Drop pure numbers and punctuation
        if !lower.chars().any(|c| c.is_alphabetic()) {
            return None;
        }

        if lower.len() < self.config.min_token_length {
            return None;
        }

        if self.config.remove_stopwords && self.stopwords.contains(lower.as_str()) {
            return None;
        }

        let token = if let Some(ref stemmer) = self.stemmer {
            stemmer.stem(&lower).to_string()
        } else {
            lower
        };

        // Filter again after stemming (some stems become too short)
        if token.len() < self.config.min_token_length {
            return None;
        }

        Some(token)
    }

    /// Stop words for short player questions.
    ///
    /// Question words ("how", "what") carry intent, not topic; intent is
    /// classified separately, so they are noise for lexical matching.
    fn default_stopwords() -> HashSet<&'static str> {
        [
            // Articles
            "a", "an", "the", // Prepositions
            "in", "on", "at", "to", "of", "with", "by", "from", "as", "into", "through", "during",
            "before", "after", "above", "below", "between", "under", "over", "out", "up", "down",
            "off", "for", // Conjunctions
            "and", "or", "but", "nor", "so", "yet", // Pronouns
            "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my",
            "your", "his", "its", "our", "their", "this", "that", "these", "those", "which", "who",
            "whom", "whose", "what", "where", "when", "how", "why", // Common verbs
            "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "having",
            "do", "does", "did", "doing", "will", "would", "could", "should", "may", "might",
            "must", "shall", "can", // Other common words
            "not", "no", "yes", "all", "any", "both", "each", "few", "more", "most", "other",
            "some", "such", "than", "too", "very", "just", "also", "only", "own", "same", "then",
            "there", "here", "now", "about", "whether", // Domain-generic
            "game", "player", // CJK function characters
            "的", "了", "是", "在", "和", "与", "或", "吗", "呢", "吧", "啊", "我", "你",
        ]
        .into_iter()
        .collect()
    }

    /// Get the number of stop words.
    #[cfg(test)]
    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenization() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("Bile Titan");

        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains(&"titan".to_string()));
    }

    #[test]
    fn test_stopword_removal() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("how to kill the charger");

        assert!(!tokens.iter().any(|t| t == "the" || t == "how" || t == "to"));
        assert!(tokens.contains(&"kill".to_string()));
        assert!(tokens.contains(&"charger".to_string()));
        assert!(tokenizer.stopword_count() > 50);
    }

    #[test]
    fn test_stemming() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("running runs");

        for token in &tokens {
            assert_eq!(token, "run");
        }
    }

    #[test]
    fn test_no_stemming() {
        let config = TokenizerConfig {
            stemming: false,
            ..Default::default()
        };
        let tokenizer = Tokenizer::new(config);
        let tokens = tokenizer.tokenize("running runs runner");

        assert_eq!(tokens, vec!["running", "runs", "runner"]);
    }

    #[test]
    fn test_min_length_filtering() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("x y z ap foo");

        assert!(!tokens.contains(&"x".to_string()));
        assert!(tokens.contains(&"ap".to_string()));
        assert!(tokens.contains(&"foo".to_string()));
    }

    #[test]
    fn test_numbers_dropped_alphanumerics_kept() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("helldiver2 deals 750 damage");

        assert!(tokens.contains(&"helldiver2".to_string()));
        assert!(!tokens.contains(&"750".to_string()));
    }

    #[test]
    fn test_cjk_unigrams_and_bigrams() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("法师职业");

        assert_eq!(tokens, vec!["法", "法师", "师", "师职", "职", "职业", "业"]);
    }

    #[test]
    fn test_cjk_runs_split_on_gaps() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("胆汁 泰坦");

        assert!(tokens.contains(&"胆汁".to_string()));
        assert!(tokens.contains(&"泰坦".to_string()));
        assert!(!tokens.contains(&"汁泰".to_string()));
    }

    #[test]
    fn test_cjk_stopwords_dropped_as_unigrams_only() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("我的");

        assert!(!tokens.contains(&"我".to_string()));
        assert!(!tokens.contains(&"的".to_string()));
        assert!(tokens.contains(&"我的".to_string()));
    }

    #[test]
    fn test_mixed_script() {
        let tokenizer = Tokenizer::new(TokenizerConfig {
            stemming: false,
            ..Default::default()
        });
        let tokens = tokenizer.tokenize("Bile Titan 弱点");

        assert_eq!(tokens, vec!["bile", "titan", "弱", "弱点", "点"]);
    }

    #[test]
    fn test_term_frequencies() {
        let tokenizer = Tokenizer::default();
        let tf = tokenizer.tokenize_with_tf("titan bile titan");

        let tf_map: std::collections::HashMap<_, _> = tf.into_iter().collect();
        assert_eq!(tf_map.get("titan"), Some(&2));
        assert_eq!(tf_map.get("bile"), Some(&1));
    }

    #[test]
    fn test_is_cjk() {
        assert!(is_cjk('法'));
        assert!(!is_cjk('a'));
        assert!(!is_cjk('ア'));
    }
}
