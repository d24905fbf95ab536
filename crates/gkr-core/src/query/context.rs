//! The per-request result of query processing.

use serde::Serialize;

use super::Language;
use crate::intent::IntentLabel;

/// What happened to the query's translation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Translation {
    /// The query was already English-like.
    NotNeeded,
    /// `translated_text` holds the model's translation.
    Applied,
    /// Translation was needed but no model was configured or the call failed.
    Skipped,
}

/// Which path produced the intent and rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessingMethod {
    Deterministic,
    Llm,
}

/// A processed query. Created once by the processor, then shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    pub raw_text: String,
    pub game_id: Option<String>,
    pub language: Language,
    pub translated_text: Option<String>,
    pub translation: Translation,
    /// Text sent to the vector retriever.
    pub rewritten_text: String,
    /// Text sent to the BM25 retriever: the query's own terms, without the
    /// guidance keywords added for semantic search.
    pub lexical_text: String,
    pub intent: IntentLabel,
    /// In [0, 1].
    pub confidence: f32,
    pub method: ProcessingMethod,
}

impl QueryContext {
    /// The translated text when present, otherwise the raw text.
    pub fn effective_text(&self) -> &str {
        self.translated_text.as_deref().unwrap_or(&self.raw_text)
    }
}
