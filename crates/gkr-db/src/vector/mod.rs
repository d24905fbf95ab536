//! Vector index module for gkr-db.
//!
//! ## Available Backends
//!
//! - `simple`: JSONL storage with an exact linear scan. A game's knowledge
//!   base is a few hundred fragments, so exact search is both fast enough
//!   and reproducible.

mod backend;
mod config;
mod traits;

pub use config::{
    check_index_compatibility, load_index_meta, write_index_meta, VectorIndexCompatibility,
    VectorIndexConfig, VectorIndexMeta, CURRENT_SCHEMA_VERSION, DEFAULT_BACKEND,
    INDEX_META_FILENAME,
};
pub use traits::{VectorIndexBackend, VectorInsert, VectorMetric, VectorSearchResult};

pub use backend::{available_backends, open_vector_index, SimpleFileVectorIndex};
