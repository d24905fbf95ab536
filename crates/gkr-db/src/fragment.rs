//! Knowledge fragments and the id → fragment side-table.
//!
//! A fragment is the unit of retrievable content. Both indexes only carry
//! fragment ids; everything the reranker and the caller need to see about a
//! fragment lives in `fragments.jsonl` next to the vector data.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filename for the fragment side-table.
pub const FRAGMENTS_FILENAME: &str = "fragments.jsonl";

// ============================================================================
// FragmentId
// ============================================================================

/// Unique identifier of a knowledge fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(String);

impl FragmentId {
    /// Create a new fragment ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying ID value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FragmentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FragmentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for FragmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// KnowledgeFragment
// ============================================================================

/// An immutable, pre-authored unit of game knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeFragment {
    /// Unique fragment id.
    pub id: FragmentId,

    /// Short title.
    pub topic: String,

    /// Prose body.
    #[serde(default)]
    pub summary: String,

    /// Keyword set.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Content-type tag, e.g. "enemy guide" or "build recommendation".
    #[serde(default)]
    pub content_type: String,

    /// Open-ended structured payload (weak points, stats, loadouts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<serde_json::Value>,
}

impl KnowledgeFragment {
    /// Create a fragment with the required fields.
    pub fn new(id: impl Into<FragmentId>, topic: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            summary: summary.into(),
            keywords: Vec::new(),
            content_type: String::new(),
            structured: None,
        }
    }

    /// Set the keyword set.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the content-type tag.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set the structured payload.
    pub fn with_structured(mut self, structured: serde_json::Value) -> Self {
        self.structured = Some(structured);
        self
    }

    /// Case-insensitive keyword membership.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        self.keywords.iter().any(|k| k.to_lowercase() == needle)
    }

    /// Text used for lexical indexing: topic, keywords, summary, then any
    /// string and numeric leaves of the structured payload.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(4);
        parts.push(self.topic.clone());
        if !self.keywords.is_empty() {
            parts.push(self.keywords.join(" "));
        }
        if !self.summary.is_empty() {
            parts.push(self.summary.clone());
        }
        if let Some(structured) = &self.structured {
            let mut leaves = Vec::new();
            flatten_value(structured, &mut leaves);
            if !leaves.is_empty() {
                parts.push(leaves.join(" "));
            }
        }
        parts.join(" ")
    }
}

fn flatten_value(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => out.push(s.clone()),
        serde_json::Value::Number(n) => out.push(n.to_string()),
        serde_json::Value::Array(items) => items.iter().for_each(|v| flatten_value(v, out)),
        serde_json::Value::Object(map) => {
            for (key, v) in map {
                out.push(key.replace('_', " "));
                flatten_value(v, out);
            }
        }
        serde_json::Value::Bool(_) | serde_json::Value::Null => {}
    }
}

// ============================================================================
// FragmentStore
// ============================================================================

/// Read-only id → fragment lookup loaded from `fragments.jsonl`.
#[derive(Debug, Default)]
pub struct FragmentStore {
    fragments: HashMap<FragmentId, KnowledgeFragment>,
}

impl FragmentStore {
    /// Build a store from in-memory fragments. Later duplicates win.
    pub fn from_fragments(fragments: impl IntoIterator<Item = KnowledgeFragment>) -> Self {
        Self {
            fragments: fragments.into_iter().map(|f| (f.id.clone(), f)).collect(),
        }
    }

    /// Load the side-table from an index directory.
    ///
    /// Unlike vector data, a malformed line here fails the load: a hit whose
    /// metadata can't be resolved is useless to every caller.
    pub fn open(dir: &Path) -> DbResult<Self> {
        let path = dir.join(FRAGMENTS_FILENAME);
        debug!("Loading fragment table from {:?}", path);

        let file = File::open(&path).map_err(|e| DbError::FragmentIo {
            path: path.clone(),
            message: format!("Failed to open fragment table: {}", e),
        })?;

        let mut fragments = HashMap::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| DbError::FragmentIo {
                path: path.clone(),
                message: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let fragment: KnowledgeFragment =
                serde_json::from_str(&line).map_err(|e| DbError::FragmentParse {
                    path: path.clone(),
                    message: format!("line {}: {}", line_num + 1, e),
                })?;
            fragments.insert(fragment.id.clone(), fragment);
        }

        debug!("Loaded {} fragments", fragments.len());
        Ok(Self { fragments })
    }

    /// Write fragments as a side-table into `dir`.
    pub fn write(dir: &Path, fragments: &[KnowledgeFragment]) -> DbResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(FRAGMENTS_FILENAME);
        let mut file = File::create(&path)?;
        for fragment in fragments {
            writeln!(file, "{}", serde_json::to_string(fragment)?)?;
        }
        Ok(path)
    }

    pub fn get(&self, id: &FragmentId) -> Option<&KnowledgeFragment> {
        self.fragments.get(id)
    }

    pub fn contains(&self, id: &FragmentId) -> bool {
        self.fragments.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Iterate fragments in id order.
    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeFragment> {
        let mut all: Vec<&KnowledgeFragment> = self.fragments.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all.into_iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
