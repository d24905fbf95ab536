//! # gkr-db
//!
//! Storage layer for GKR - per-game vector index and fragment side-table.
//!
//! Indexes are produced offline by the ingestion pipeline. At query time this
//! crate only opens and reads them; the write paths exist so tools and tests
//! can produce fixtures in the same format.
//!
//! ## Layout
//!
//! ```text
//! <game_dir>/vectors/
//! ├── index.meta.json   # backend, dimension, metric, schemaVersion
//! ├── vectors.jsonl     # {"id": "<fragment id>", "vector": [...]}
//! └── fragments.jsonl   # one KnowledgeFragment per line
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use gkr_db::vector::{load_index_meta, open_vector_index, VectorIndexConfig};
//!
//! let meta = load_index_meta(&dir)?;
//! let config = VectorIndexConfig::from_meta(&meta, &dir);
//! let index = open_vector_index(&config)?;
//! let hits = index.query(&embedding, 10)?;
//! ```

pub mod error;
pub mod fragment;
pub mod vector;

pub use error::{DbError, DbResult};
pub use fragment::{FragmentId, FragmentStore, KnowledgeFragment, FRAGMENTS_FILENAME};
