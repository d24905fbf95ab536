//! BM25 inverted index over knowledge fragments.
//!
//! - Term → fragment postings with term frequencies
//! - Pre-computed document lengths
//! - Weighted query-time scoring (see [`Bm25Index::search_weighted`])

use std::collections::HashMap;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::scorer::{bm25_term_score, idf, Bm25Params, ScoredTerm};
use super::tokenizer::{Tokenizer, TokenizerConfig};
use super::{Bm25Config, Bm25SearchResult};

/// Statistics for a single document in the index.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct DocumentStats {
    /// Number of tokens in the document.
    pub length: usize,
    /// Fragment id.
    pub doc_id: String,
}

/// Posting entry: document index and term frequency.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct Posting {
    /// Index into the documents array.
    pub doc_idx: usize,
    /// Term frequency in this document.
    pub term_freq: usize,
}

/// BM25 Inverted Index.
///
/// Stores:
/// - Vocabulary: term → (term_id, document frequency, postings)
/// - Documents: array of document stats
/// - Pre-computed average document length
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct Bm25Index {
    /// BM25 parameters.
    params: Bm25Params,
    /// Tokenizer configuration (for query tokenization).
    tokenizer_config: TokenizerConfig,
    /// Term → postings list.
    /// Each entry: (document_frequency, postings)
    inverted_index: HashMap<String, (usize, Vec<Posting>)>,
    /// Document statistics indexed by internal doc_idx.
    documents: Vec<DocumentStats>,
    /// Average document length.
    avg_doc_len: f32,
    /// Total number of tokens in the corpus.
    total_tokens: usize,
}

impl Bm25Index {
    /// Create a new empty BM25 index.
    pub fn new(config: Bm25Config) -> Self {
        let tokenizer_config = TokenizerConfig {
            stemming: config.stemming,
            remove_stopwords: config.remove_stopwords,
            min_token_length: config.min_token_length,
            cjk_bigrams: config.cjk_bigrams,
        };

        Self {
            params: Bm25Params {
                k1: config.k1,
                b: config.b,
            },
            tokenizer_config,
            inverted_index: HashMap::new(),
            documents: Vec::new(),
            avg_doc_len: 0.0,
            total_tokens: 0,
        }
    }

    /// Add a document to the index.
    ///
    /// # Arguments
    ///
    /// * `doc_id` - Fragment id
    /// * `text` - Searchable fragment text
    ///
    /// # Returns
    ///
    /// The internal document index assigned to this document.
    pub fn add_document(&mut self, doc_id: String, text: &str) -> usize {
        let tokenizer = Tokenizer::new(self.tokenizer_config.clone());
        let tokens = tokenizer.tokenize(text);
        let doc_len = tokens.len();

        // Compute term frequencies for this document
        let mut term_freqs: HashMap<String, usize> = HashMap::new();
        for token in tokens {
            *term_freqs.entry(token).or_insert(0) += 1;
        }

        // Add document to documents array
        let doc_idx = self.documents.len();
        self.documents.push(DocumentStats {
            length: doc_len,
            doc_id,
        });

        // Update inverted index
        for (term, tf) in term_freqs {
            let entry = self.inverted_index.entry(term).or_insert((0, Vec::new()));
            entry.0 += 1; // Increment document frequency
            entry.1.push(Posting {
                doc_idx,
                term_freq: tf,
            });
        }

        // Update corpus statistics
        self.total_tokens += doc_len;
        self.avg_doc_len = self.total_tokens as f32 / self.documents.len() as f32;

        doc_idx
    }

    /// Build the index from an iterator of (doc_id, text) pairs.
    pub fn build_from_iter<I, S1, S2>(&mut self, documents: I)
    where
        I: Iterator<Item = (S1, S2)>,
        S1: Into<String>,
        S2: AsRef<str>,
    {
        for (doc_id, text) in documents {
            self.add_document(doc_id.into(), text.as_ref());
        }
    }

    /// The tokenizer used for both documents and queries.
    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(self.tokenizer_config.clone())
    }

    /// Search with every query token weighted 1.0.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<Bm25SearchResult> {
        let terms: Vec<(String, f32)> = self
            .tokenizer()
            .tokenize(query)
            .into_iter()
            .map(|t| (t, 1.0))
            .collect();
        self.search_weighted(&terms, top_k)
    }

    /// Search with pre-tokenized, weighted query terms.
    ///
    /// Weights of repeated terms add up. Terms missing from the vocabulary
    /// are ignored. Results are sorted by score descending, ties broken by
    /// insertion order so the ranking is deterministic.
    pub fn search_weighted(&self, terms: &[(String, f32)], top_k: usize) -> Vec<Bm25SearchResult> {
        if self.documents.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut merged: Vec<(&str, f32)> = Vec::new();
        for (term, weight) in terms {
            if *weight <= 0.0 {
                continue;
            }
            match merged.iter_mut().find(|(t, _)| *t == term.as_str()) {
                Some(entry) => entry.1 += weight,
                None => merged.push((term.as_str(), *weight)),
            }
        }

        let num_docs = self.documents.len();
        let query_terms: Vec<ScoredTerm<'_>> = merged
            .into_iter()
            .filter_map(|(term, weight)| {
                self.inverted_index.get(term).map(|(df, _)| ScoredTerm {
                    term,
                    idf: idf(num_docs, *df),
                    weight,
                })
            })
            .collect();

        if query_terms.is_empty() {
            return Vec::new();
        }

        // Score every document holding at least one query term
        let mut scores: HashMap<usize, f32> = HashMap::new();
        for qt in &query_terms {
            if let Some((_, postings)) = self.inverted_index.get(qt.term) {
                for posting in postings {
                    let doc_stats = &self.documents[posting.doc_idx];
                    let term_score = bm25_term_score(
                        posting.term_freq,
                        doc_stats.length,
                        self.avg_doc_len,
                        qt.idf,
                        &self.params,
                    );
                    *scores.entry(posting.doc_idx).or_insert(0.0) += qt.weight * term_score;
                }
            }
        }

        let mut scored_docs: Vec<(usize, f32)> = scores.into_iter().collect();
        scored_docs.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        scored_docs
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(rank, (doc_idx, score))| Bm25SearchResult {
                doc_id: self.documents[doc_idx].doc_id.clone(),
                score,
                rank: rank + 1,
            })
            .collect()
    }

    /// Get the number of documents in the index.
    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    /// Get the number of unique terms in the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.inverted_index.len()
    }

    /// Get the average document length.
    pub fn avg_doc_length(&self) -> f32 {
        self.avg_doc_len
    }

    /// Get document frequency for a term.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.inverted_index
            .get(term)
            .map(|(df, _)| *df)
            .unwrap_or(0)
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Get index statistics for debugging/logging.
    pub fn stats(&self) -> Bm25IndexStats {
        Bm25IndexStats {
            num_documents: self.documents.len(),
            vocabulary_size: self.inverted_index.len(),
            total_tokens: self.total_tokens,
            avg_doc_length: self.avg_doc_len,
        }
    }
}

/// Statistics about the BM25 index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bm25IndexStats {
    /// Number of documents indexed.
    pub num_documents: usize,
    /// Number of unique terms in vocabulary.
    pub vocabulary_size: usize,
    /// Total tokens across all documents.
    pub total_tokens: usize,
    /// Average document length.
    pub avg_doc_length: f32,
}
