//! BM25 lexical retrieval.
//!
//! The sparse half of the dual retriever. Fragments are indexed offline; at
//! query time the index is read-only and searched with weighted terms built
//! from the rewritten query (see [`crate::lexical`]).
//!
//! - [`tokenizer`]: Unicode word segmentation, Porter stemming, CJK bigrams
//! - [`index`]: inverted index with weighted search
//! - [`scorer`]: BM25 scoring (k1=1.2, b=0.75)
//! - [`storage`]: bincode persistence
//!
//! ```ignore
//! use gkr_core::bm25::{Bm25Config, Bm25Index};
//!
//! let mut index = Bm25Index::new(Bm25Config::default());
//! index.add_document("hd2-bile-titan".into(), "Bile Titan weak points");
//! let hits = index.search_weighted(&[("titan".into(), 5.0)], 30);
//! ```

mod index;
mod scorer;
mod storage;
mod tokenizer;

pub use index::{Bm25Index, Bm25IndexStats, DocumentStats};
pub use scorer::{bm25_score, Bm25Params, ScoredTerm};
pub use storage::{
    bm25_dir_for_game, bm25_index_exists, load_bm25_index, load_bm25_meta, save_bm25_index,
    Bm25IndexMeta, BM25_DIR_NAME,
};
pub use tokenizer::{is_cjk, Tokenizer, TokenizerConfig};

use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration
// ============================================================================

/// BM25 configuration used when building an index.
///
/// Tokenizer settings are stored inside the index, so queries are always
/// tokenized the way the documents were.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bm25Config {
    /// Term frequency saturation. Default: 1.2
    #[serde(default = "default_k1")]
    pub k1: f32,

    /// Document length normalization. Default: 0.75
    #[serde(default = "default_b")]
    pub b: f32,

    /// Porter stemming for Latin-script tokens. Default: true
    #[serde(default = "default_true")]
    pub stemming: bool,

    /// Stop word removal. Default: true
    #[serde(default = "default_true")]
    pub remove_stopwords: bool,

    /// Minimum Latin token length. Default: 2
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,

    /// Index adjacent CJK character pairs. Default: true
    #[serde(default = "default_true")]
    pub cjk_bigrams: bool,
}

fn default_k1() -> f32 {
    1.2
}

fn default_b() -> f32 {
    0.75
}

fn default_true() -> bool {
    true
}

fn default_min_token_length() -> usize {
    2
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            stemming: true,
            remove_stopwords: true,
            min_token_length: default_min_token_length(),
            cjk_bigrams: true,
        }
    }
}

/// Result from BM25 search.
#[derive(Debug, Clone, PartialEq)]
pub struct Bm25SearchResult {
    /// Fragment id.
    pub doc_id: String,
    /// Weighted BM25 score.
    pub score: f32,
    /// Rank in the BM25 result list (1-indexed).
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Bm25Config::default();
        assert!((config.k1 - 1.2).abs() < 0.001);
        assert!((config.b - 0.75).abs() < 0.001);
        assert!(config.stemming);
        assert!(config.cjk_bigrams);
    }

    #[test]
    fn test_config_from_partial_yaml() {
        let config: Bm25Config = serde_yaml::from_str("k1: 1.5\ncjkBigrams: false\n").unwrap();
        assert!((config.k1 - 1.5).abs() < 0.001);
        assert!(!config.cjk_bigrams);
        assert!(config.remove_stopwords);
    }
}
