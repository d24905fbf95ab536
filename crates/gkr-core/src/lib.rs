//! # gkr-core
//!
//! **Game Knowledge Retrieval** – core engine library.
//!
//! Turns a player's free-text question into a short, ranked list of
//! pre-authored knowledge fragments for one game. The pipeline is
//! query processing, concurrent vector and BM25 retrieval, reciprocal rank
//! fusion and intent-aware reranking.
//!
//! ## Main Types
//!
//! - [`RetrievalEngine`] – the entry point; [`RetrievalEngine::query`] is the
//!   only public query operation
//! - [`RetrievalConfig`] – configuration loaded from `~/.gkr/config.yaml`
//! - [`GkrError`] – the only error returned from the public API
//!
//! ## Modules
//!
//! - [`query`] – language detection, LLM analysis, rewriting and the query cache
//! - [`retriever`] – dual vector/lexical retrieval
//! - [`fusion`] – weighted reciprocal rank fusion
//! - [`rerank`] – intent-aware reranking
//! - [`intent`] – the intent taxonomy and deterministic classifier
//! - [`bm25`] – the sparse lexical index
//! - [`index`] – per-game index bundles on disk
//! - [`external`] – timeout and retry policy for model calls
//!
//! ## Example
//!
//! ```ignore
//! use gkr_core::{RetrievalConfig, RetrievalEngine};
//!
//! let engine = RetrievalEngine::from_config(RetrievalConfig::load_default()?)?;
//! engine.preload(&["helldiver2"])?;
//!
//! let hits = engine.query("how to kill bile titan", "helldiver2", 5).await?;
//! for hit in &hits {
//!     println!("{:.3} {}", hit.final_score, hit.fragment.topic);
//! }
//! ```

pub mod bm25;
pub mod config;
pub mod engine;
pub mod errors;
pub mod external;
pub mod fusion;
pub mod game;
pub mod index;
pub mod intent;
pub mod lexical;
pub mod query;
pub mod rerank;
pub mod retriever;
pub mod text;

pub use bm25::{
    load_bm25_index, save_bm25_index, Bm25Config, Bm25Index, Bm25SearchResult, Tokenizer,
    TokenizerConfig, BM25_DIR_NAME,
};
pub use config::{RetrievalConfig, CONFIG_ENV_VAR, DEFAULT_TOP_K};
pub use engine::{QueryHit, QueryReport, RetrievalEngine, StageTimings};
pub use errors::{ExternalServiceError, GkrError};
pub use external::{CallPolicies, CallPolicy};
pub use fusion::{fuse, FusedHit, FusionConfig};
pub use game::{GameCatalog, GameProfile, PhraseCategory, WeightedPhrase};
pub use index::{available_games, game_index_meta, game_root, GameIndex, VECTORS_DIR_NAME};
pub use intent::{Classification, IntentLabel, IntentTaxonomy, TaxonomyConfig, WeightProfile};
pub use lexical::LexicalQuery;
pub use query::{
    Language, ProcessingMethod, QueryContext, QueryProcessingConfig, QueryProcessor, Translation,
};
pub use rerank::{
    IntentReranker, RerankConfig, RerankedHit, SemanticSignal, SubIntent, SubIntentConfig,
    SubIntentMatch,
};
pub use retriever::{DualRetriever, HitSource, RetrievalHit, RetrievalLists};

// Storage and model types that appear in the public API
pub use gkr_db::vector::{write_index_meta, VectorIndexMeta};
pub use gkr_db::{FragmentId, FragmentStore, KnowledgeFragment};
pub use gkr_model::{
    CompletionConfig, CompletionModel, EmbeddingConfig, EmbeddingModel, ProviderKind,
};
