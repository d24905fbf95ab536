//! BM25 index serialization and storage.
//!
//! Uses bincode v2 for the index itself. Per-game layout:
//!
//! ```text
//! <data_dir>/<game_id>/bm25/
//! ├── index.bin         # Serialized Bm25Index
//! └── meta.json         # Version, stats, build time
//! ```

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use bincode::config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::index::{Bm25Index, Bm25IndexStats};
use crate::errors::GkrError;

/// Directory name for BM25 index storage.
pub const BM25_DIR_NAME: &str = "bm25";

/// Filename for the serialized index.
pub const INDEX_FILENAME: &str = "index.bin";

/// Filename for index metadata.
pub const META_FILENAME: &str = "meta.json";

/// BM25 index metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bm25IndexMeta {
    /// Index version for compatibility checks.
    pub version: u32,
    /// Statistics about the index.
    pub stats: Bm25IndexStats,
    /// When the index was built.
    pub built_at: DateTime<Utc>,
}

impl Bm25IndexMeta {
    /// Current index version.
    pub const CURRENT_VERSION: u32 = 2;

    /// Create new metadata for an index.
    pub fn new(stats: Bm25IndexStats) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            stats,
            built_at: Utc::now(),
        }
    }
}

/// BM25 directory for a game.
pub fn bm25_dir_for_game(game_root: &Path) -> PathBuf {
    game_root.join(BM25_DIR_NAME)
}

fn index_path(bm25_dir: &Path) -> PathBuf {
    bm25_dir.join(INDEX_FILENAME)
}

fn meta_path(bm25_dir: &Path) -> PathBuf {
    bm25_dir.join(META_FILENAME)
}

fn io_error(path: &Path, what: &str, e: impl std::fmt::Display) -> GkrError {
    GkrError::IndexIo {
        path: path.to_path_buf(),
        message: format!("{what}: {e}"),
    }
}

fn parse_error(path: &Path, what: &str, e: impl std::fmt::Display) -> GkrError {
    GkrError::IndexParse {
        path: path.to_path_buf(),
        message: format!("{what}: {e}"),
    }
}

/// Save a BM25 index under `game_root/bm25/`.
///
/// Index building is an offline concern; this exists so tools and tests can
/// produce fixtures in the exact format [`load_bm25_index`] reads.
pub fn save_bm25_index(index: &Bm25Index, game_root: &Path) -> Result<PathBuf, GkrError> {
    let bm25_dir = bm25_dir_for_game(game_root);
    fs::create_dir_all(&bm25_dir)
        .map_err(|e| io_error(&bm25_dir, "Failed to create BM25 directory", e))?;

    let index_file = index_path(&bm25_dir);
    let file = fs::File::create(&index_file)
        .map_err(|e| io_error(&index_file, "Failed to create BM25 index file", e))?;
    let mut writer = BufWriter::new(file);
    bincode::encode_into_std_write(index, &mut writer, config::standard())
        .map_err(|e| parse_error(&index_file, "Failed to serialize BM25 index", e))?;

    let meta = Bm25IndexMeta::new(index.stats());
    let meta_file = meta_path(&bm25_dir);
    let meta_json = serde_json::to_string_pretty(&meta)?;
    fs::write(&meta_file, meta_json)
        .map_err(|e| io_error(&meta_file, "Failed to write BM25 metadata", e))?;

    tracing::debug!(
        "Saved BM25 index to {}: {} docs, {} terms",
        bm25_dir.display(),
        index.num_documents(),
        index.vocabulary_size()
    );

    Ok(bm25_dir)
}

/// Load a game's BM25 index.
///
/// Strict: a missing index file, unreadable metadata or a version mismatch
/// is an error. `game_id` is only used to label errors.
pub fn load_bm25_index(game_id: &str, game_root: &Path) -> Result<Bm25Index, GkrError> {
    let bm25_dir = bm25_dir_for_game(game_root);
    let index_file = index_path(&bm25_dir);

    if !index_file.exists() {
        return Err(GkrError::IndexIo {
            path: index_file,
            message: "BM25 index file not found".to_string(),
        });
    }

    if let Some(meta) = load_bm25_meta(game_root)? {
        if meta.version != Bm25IndexMeta::CURRENT_VERSION {
            return Err(GkrError::IndexIncompatible {
                game_id: game_id.to_string(),
                path: meta_path(&bm25_dir),
                reason: format!(
                    "BM25 index version {} found, expected {}",
                    meta.version,
                    Bm25IndexMeta::CURRENT_VERSION
                ),
            });
        }
    }

    let file = fs::File::open(&index_file)
        .map_err(|e| io_error(&index_file, "Failed to open BM25 index", e))?;
    let mut reader = BufReader::new(file);
    let index: Bm25Index = bincode::decode_from_std_read(&mut reader, config::standard())
        .map_err(|e| parse_error(&index_file, "Failed to deserialize BM25 index", e))?;

    tracing::debug!(
        "Loaded BM25 index from {}: {} docs, {} terms",
        bm25_dir.display(),
        index.num_documents(),
        index.vocabulary_size()
    );

    Ok(index)
}

/// Check if a BM25 index exists for a game.
pub fn bm25_index_exists(game_root: &Path) -> bool {
    index_path(&bm25_dir_for_game(game_root)).exists()
}

/// Load BM25 index metadata without loading the full index.
pub fn load_bm25_meta(game_root: &Path) -> Result<Option<Bm25IndexMeta>, GkrError> {
    let meta_file = meta_path(&bm25_dir_for_game(game_root));

    if !meta_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&meta_file)
        .map_err(|e| io_error(&meta_file, "Failed to read BM25 metadata", e))?;
    let meta: Bm25IndexMeta = serde_json::from_str(&content)
        .map_err(|e| parse_error(&meta_file, "Failed to parse BM25 metadata", e))?;

    Ok(Some(meta))
}
