//! Per-game index bundle: vector index, BM25 index and fragment side-table.
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/<game_id>/
//! ├── vectors/
//! │   ├── index.meta.json
//! │   ├── vectors.jsonl
//! │   └── fragments.jsonl
//! └── bm25/
//!     ├── index.bin
//!     └── meta.json
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use gkr_db::vector::{
    load_index_meta, open_vector_index, VectorIndexBackend, VectorIndexConfig, VectorIndexMeta,
    INDEX_META_FILENAME,
};
use gkr_db::FragmentStore;

use crate::bm25::{bm25_index_exists, load_bm25_index, Bm25Index};
use crate::errors::GkrError;

/// Vector index subdirectory of a game directory.
pub const VECTORS_DIR_NAME: &str = "vectors";

/// Everything needed to answer queries for one game. Immutable once loaded.
pub struct GameIndex {
    pub game_id: String,
    pub root: PathBuf,
    pub vector_meta: VectorIndexMeta,
    pub vectors: Arc<dyn VectorIndexBackend>,
    pub lexical: Bm25Index,
    pub fragments: FragmentStore,
}

impl std::fmt::Debug for GameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameIndex")
            .field("game_id", &self.game_id)
            .field("root", &self.root)
            .field("dimension", &self.vector_meta.dimension)
            .field("lexical_docs", &self.lexical.num_documents())
            .field("fragments", &self.fragments.len())
            .finish()
    }
}

/// Vector index directory for a game directory.
pub fn vectors_dir_for_game(game_root: &Path) -> PathBuf {
    game_root.join(VECTORS_DIR_NAME)
}

/// Whether `game_root` holds both indexes.
pub fn game_index_exists(game_root: &Path) -> bool {
    vectors_dir_for_game(game_root)
        .join(INDEX_META_FILENAME)
        .is_file()
        && bm25_index_exists(game_root)
}

/// Game ids under `data_dir` that have a complete index, sorted.
pub fn available_games(data_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(data_dir) else {
        return Vec::new();
    };

    let mut games: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| game_index_exists(&e.path()))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    games.sort();
    games
}

/// Directory of `game_id` under `data_dir`.
///
/// A game id names exactly one directory entry. Empty ids, `.`/`..`,
/// separators and absolute paths are reported as unknown games.
pub fn game_root(data_dir: &Path, game_id: &str) -> Result<PathBuf, GkrError> {
    let mut components = Path::new(game_id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == game_id => Ok(data_dir.join(name)),
        _ => Err(GkrError::GameIndexNotFound {
            game_id: game_id.to_string(),
            available: available_games(data_dir),
        }),
    }
}

/// Vector index metadata of `game_id` without loading the indexes.
pub fn game_index_meta(data_dir: &Path, game_id: &str) -> Result<VectorIndexMeta, GkrError> {
    let vectors_dir = vectors_dir_for_game(&game_root(data_dir, game_id)?);
    load_index_meta(&vectors_dir).map_err(|e| GkrError::from_db(game_id, e))
}

impl GameIndex {
    /// Load the indexes of `game_id` from `data_dir`.
    ///
    /// `expected_dimension` is the embedding model's output size; a vector
    /// index of another dimension is rejected as incompatible.
    ///
    /// # Errors
    ///
    /// - [`GkrError::GameIndexNotFound`] when the game directory is missing
    /// - [`GkrError::IndexIo`] / [`GkrError::IndexParse`] for unreadable files
    /// - [`GkrError::IndexIncompatible`] for version or dimension mismatches
    pub fn load(
        data_dir: &Path,
        game_id: &str,
        expected_dimension: Option<usize>,
    ) -> Result<Self, GkrError> {
        let root = game_root(data_dir, game_id)?;
        if !root.is_dir() {
            return Err(GkrError::GameIndexNotFound {
                game_id: game_id.to_string(),
                available: available_games(data_dir),
            });
        }

        let vectors_dir = vectors_dir_for_game(&root);
        let vector_meta =
            load_index_meta(&vectors_dir).map_err(|e| GkrError::from_db(game_id, e))?;

        if let Some(expected) = expected_dimension {
            if vector_meta.dimension != expected {
                return Err(GkrError::IndexIncompatible {
                    game_id: game_id.to_string(),
                    path: vectors_dir,
                    reason: format!(
                        "index dimension {} does not match embedding dimension {}",
                        vector_meta.dimension, expected
                    ),
                });
            }
        }

        let config = VectorIndexConfig::from_meta(&vector_meta, &vectors_dir);
        let vectors = open_vector_index(&config).map_err(|e| GkrError::from_db(game_id, e))?;
        let fragments =
            FragmentStore::open(&vectors_dir).map_err(|e| GkrError::from_db(game_id, e))?;
        let lexical = load_bm25_index(game_id, &root)?;

        let vector_count = vectors.len().map_err(|e| GkrError::from_db(game_id, e))?;
        if vector_count != fragments.len() || lexical.num_documents() != fragments.len() {
            tracing::warn!(
                game_id,
                vectors = vector_count,
                lexical = lexical.num_documents(),
                fragments = fragments.len(),
                "Index sizes differ; hits without metadata will be dropped"
            );
        }

        tracing::info!(
            game_id,
            fragments = fragments.len(),
            dimension = vector_meta.dimension,
            "Loaded game index"
        );

        Ok(Self {
            game_id: game_id.to_string(),
            root,
            vector_meta,
            vectors,
            lexical,
            fragments,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bm25::{save_bm25_index, Bm25Config};
    use gkr_db::vector::{write_index_meta, VectorInsert, VectorMetric, DEFAULT_BACKEND};
    use gkr_db::KnowledgeFragment;
    use tempfile::TempDir;

    pub(crate) fn write_game(data_dir: &Path, game_id: &str, dimension: usize) {
        let root = data_dir.join(game_id);
        let vectors_dir = vectors_dir_for_game(&root);

        let fragments = vec![
            KnowledgeFragment::new("f1", "Bile Titan", "Weak point: head"),
            KnowledgeFragment::new("f2", "Charger", "Aim for the legs"),
        ];
        FragmentStore::write(&vectors_dir, &fragments).unwrap();

        let mut meta = VectorIndexMeta::new(DEFAULT_BACKEND, dimension, VectorMetric::Cosine);
        meta.update_count(2);
        write_index_meta(&vectors_dir, &meta).unwrap();
        let config = VectorIndexConfig::from_meta(&meta, &vectors_dir).with_create_if_missing(true);
        let index = open_vector_index(&config).unwrap();
        index
            .upsert(&[
                VectorInsert::new("f1", vec![1.0; dimension]),
                VectorInsert::new("f2", vec![0.5; dimension]),
            ])
            .unwrap();
        index.flush().unwrap();

        let mut bm25 = Bm25Index::new(Bm25Config::default());
        for f in &fragments {
            bm25.add_document(f.id.to_string(), &f.search_text());
        }
        save_bm25_index(&bm25, &root).unwrap();
    }

    #[test]
    fn test_load_complete_game() {
        let temp = TempDir::new().unwrap();
        write_game(temp.path(), "helldiver2", 4);

        let index = GameIndex::load(temp.path(), "helldiver2", Some(4)).unwrap();
        assert_eq!(index.fragments.len(), 2);
        assert_eq!(index.lexical.num_documents(), 2);
        assert_eq!(index.vectors.len().unwrap(), 2);
    }

    #[test]
    fn test_available_games_requires_both_indexes() {
        let temp = TempDir::new().unwrap();
        write_game(temp.path(), "helldiver2", 4);
        write_game(temp.path(), "dst", 4);
        std::fs::create_dir_all(temp.path().join("eldenring/vectors")).unwrap();

        assert_eq!(available_games(temp.path()), vec!["dst", "helldiver2"]);
        assert!(available_games(&temp.path().join("missing")).is_empty());
    }

    #[test]
    fn test_missing_game_lists_available() {
        let temp = TempDir::new().unwrap();
        write_game(temp.path(), "dst", 4);

        let err = GameIndex::load(temp.path(), "zelda", None).unwrap_err();
        match err {
            GkrError::GameIndexNotFound { game_id, available } => {
                assert_eq!(game_id, "zelda");
                assert_eq!(available, vec!["dst"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_dimension_mismatch_is_incompatible() {
        let temp = TempDir::new().unwrap();
        write_game(temp.path(), "dst", 4);

        let err = GameIndex::load(temp.path(), "dst", Some(8)).unwrap_err();
        assert!(matches!(err, GkrError::IndexIncompatible { .. }));
    }

    #[test]
    fn test_meta_without_loading() {
        let temp = TempDir::new().unwrap();
        write_game(temp.path(), "dst", 4);

        let meta = game_index_meta(temp.path(), "dst").unwrap();
        assert_eq!(meta.dimension, 4);
        assert_eq!(meta.count, 2);
        assert!(game_index_meta(temp.path(), "zelda").is_err());
    }

    #[test]
    fn test_game_id_must_stay_inside_data_dir() {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("data");
        write_game(&data_dir, "dst", 4);
        write_game(temp.path(), "secret", 4);

        let outside = temp.path().join("secret");
        let outside = outside.to_str().unwrap();
        for game_id in ["../secret", "dst/../../secret", outside, "", ".", "..", "./dst"] {
            match GameIndex::load(&data_dir, game_id, None) {
                Err(GkrError::GameIndexNotFound { available, .. }) => {
                    assert_eq!(available, vec!["dst"], "game id {game_id:?}");
                }
                other => panic!("game id {game_id:?} loaded: {other:?}"),
            }
            assert!(game_index_meta(&data_dir, game_id).is_err());
        }
        assert!(GameIndex::load(&data_dir, "dst", None).is_ok());
    }

    #[test]
    fn test_missing_bm25_is_io_error() {
        let temp = TempDir::new().unwrap();
        write_game(temp.path(), "dst", 4);
        std::fs::remove_dir_all(temp.path().join("dst/bm25")).unwrap();

        let err = GameIndex::load(temp.path(), "dst", None).unwrap_err();
        assert!(matches!(err, GkrError::IndexIo { .. }));
    }

    #[test]
    fn test_corrupt_side_table_is_parse_error() {
        let temp = TempDir::new().unwrap();
        write_game(temp.path(), "dst", 4);
        std::fs::write(temp.path().join("dst/vectors/fragments.jsonl"), "{not json}\n").unwrap();

        let err = GameIndex::load(temp.path(), "dst", None).unwrap_err();
        assert!(matches!(err, GkrError::IndexParse { .. }));
    }
}
