//! The retrieval engine: the single public query entry point.
//!
//! [`RetrievalEngine`] owns the query processor, the dual retriever, the
//! reranker and a registry of per-game indexes loaded on first use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use gkr_db::{FragmentId, KnowledgeFragment};
use gkr_model::{create_completion_model, create_embedding_model, CompletionModel, EmbeddingModel};
use serde::Serialize;

use crate::config::RetrievalConfig;
use crate::errors::GkrError;
use crate::fusion::fuse;
use crate::game::GameCatalog;
use crate::index::{available_games, GameIndex};
use crate::intent::IntentTaxonomy;
use crate::query::{QueryContext, QueryProcessor};
use crate::rerank::{IntentReranker, RerankedHit, SubIntentMatch};
use crate::retriever::DualRetriever;

// ============================================================================
// Results
// ============================================================================

/// One ranked answer candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHit {
    pub fragment_id: FragmentId,
    /// In [0, 1].
    pub final_score: f32,
    pub fragment: KnowledgeFragment,
}

/// Wall-clock time spent in each stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub processing_ms: f64,
    pub retrieval_ms: f64,
    pub fusion_ms: f64,
    pub rerank_ms: f64,
    pub total_ms: f64,
}

/// Everything a query produced, for diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    pub context: QueryContext,
    /// The reranker's finer reading of the query.
    pub sub_intent: SubIntentMatch,
    pub vector_hits: usize,
    pub lexical_hits: usize,
    pub fused_hits: usize,
    pub timings: StageTimings,
    /// Reranked hits with their score breakdown, best first.
    pub reranked: Vec<RerankedHit>,
    pub results: Vec<QueryHit>,
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

// ============================================================================
// RetrievalEngine
// ============================================================================

/// Hybrid retrieval over per-game knowledge indexes.
///
/// # Example
///
/// ```ignore
/// use gkr_core::{RetrievalConfig, RetrievalEngine};
///
/// let engine = RetrievalEngine::from_config(RetrievalConfig::load_default()?)?;
/// let hits = engine.query("how to kill bile titan", "helldiver2", 5).await?;
/// for hit in hits {
///     println!("{} {:.3} {}", hit.fragment_id, hit.final_score, hit.fragment.topic);
/// }
/// ```
#[derive(Debug)]
pub struct RetrievalEngine {
    config: RetrievalConfig,
    data_dir: PathBuf,
    catalog: Arc<GameCatalog>,
    taxonomy: Arc<IntentTaxonomy>,
    processor: QueryProcessor,
    retriever: DualRetriever,
    reranker: IntentReranker,
    /// Embedding dimension every loaded vector index must match.
    expected_dimension: Option<usize>,
    indexes: RwLock<HashMap<String, Arc<GameIndex>>>,
}

impl RetrievalEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Build an engine without any external model. Retrieval is BM25 only
    /// and query processing is deterministic until models are attached with
    /// [`with_embedding_model`](Self::with_embedding_model) and
    /// [`with_completion_model`](Self::with_completion_model).
    ///
    /// # Errors
    ///
    /// [`GkrError::InvalidConfiguration`] if `config` fails validation or the
    /// catalog or taxonomy cannot be built.
    pub fn new(config: RetrievalConfig) -> Result<Self, GkrError> {
        for warning in config.validate()? {
            tracing::debug!("Config warning: {}", warning);
        }

        let catalog = Arc::new(config.load_catalog()?);
        let taxonomy = Arc::new(IntentTaxonomy::new(&config.intents)?);

        let processor = QueryProcessor::new(
            Arc::clone(&taxonomy),
            Arc::clone(&catalog),
            config.query_processing.clone(),
            config.calls.completion.clone(),
        );
        let retriever = DualRetriever::new(Arc::clone(&catalog), config.calls.embedding.clone());
        let reranker = IntentReranker::new(
            Arc::clone(&taxonomy),
            config.fusion.clone(),
            config.rerank.clone(),
        )?;

        Ok(Self {
            data_dir: config.resolved_data_dir(),
            config,
            catalog,
            taxonomy,
            processor,
            retriever,
            reranker,
            expected_dimension: None,
            indexes: RwLock::new(HashMap::new()),
        })
    }

    /// Build an engine and the models named in `config`.
    pub fn from_config(config: RetrievalConfig) -> Result<Self, GkrError> {
        let embedder = create_embedding_model(&config.embedding)?;
        let completion = create_completion_model(&config.completion)?;

        let mut engine = Self::new(config)?;
        if let Some(model) = embedder {
            engine = engine.with_embedding_model(model);
        }
        if let Some(model) = completion {
            engine = engine.with_completion_model(model);
        }
        Ok(engine)
    }

    /// Load `~/.gkr/config.yaml` (or `$GKR_CONFIG`) and build an engine.
    pub fn with_defaults() -> Result<Self, GkrError> {
        Self::from_config(RetrievalConfig::load_default()?)
    }

    /// Load the config at `path` and build an engine.
    pub fn with_config(path: &Path) -> Result<Self, GkrError> {
        Self::from_config(RetrievalConfig::from_path(path)?)
    }

    /// Use `model` for the vector retrieval path.
    ///
    /// Game indexes loaded afterwards must match the model's dimension.
    pub fn with_embedding_model(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        tracing::debug!(model = model.model_id(), dimension = model.dimension(), "Embedding model attached");
        self.expected_dimension = Some(model.dimension());
        self.retriever = self.retriever.with_embedding_model(model);
        self.indexes_mut().clear();
        self
    }

    /// Use `model` for query analysis.
    pub fn with_completion_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        tracing::debug!(model = model.model_id(), "Completion model attached");
        self.processor = self.processor.with_completion_model(model);
        self
    }

    /// Override the data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self.indexes_mut().clear();
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    pub fn taxonomy(&self) -> &IntentTaxonomy {
        &self.taxonomy
    }

    pub fn processor(&self) -> &QueryProcessor {
        &self.processor
    }

    // -------------------------------------------------------------------------
    // Game indexes
    // -------------------------------------------------------------------------

    /// Games under the data directory with both indexes present.
    pub fn available_games(&self) -> Vec<String> {
        available_games(&self.data_dir)
    }

    /// Map a window title, alias or id to a catalog game id.
    pub fn resolve_game(&self, title_or_id: &str) -> Option<&str> {
        self.catalog.resolve(title_or_id)
    }

    /// The index of `game_id`, loading it on first use.
    ///
    /// # Errors
    ///
    /// See [`GameIndex::load`].
    pub fn game_index(&self, game_id: &str) -> Result<Arc<GameIndex>, GkrError> {
        if let Some(index) = self.indexes_ref().get(game_id) {
            return Ok(Arc::clone(index));
        }

        let loaded = Arc::new(GameIndex::load(
            &self.data_dir,
            game_id,
            self.expected_dimension,
        )?);

        // Another caller may have loaded it meanwhile; keep the first
        let mut indexes = self.indexes_mut();
        let index = indexes.entry(game_id.to_string()).or_insert(loaded);
        Ok(Arc::clone(index))
    }

    /// Load the indexes of `games` now, failing on the first broken one.
    pub fn preload(&self, games: &[&str]) -> Result<(), GkrError> {
        for game in games {
            self.game_index(game)?;
        }
        Ok(())
    }

    /// Game ids whose indexes are currently loaded, sorted.
    pub fn loaded_games(&self) -> Vec<String> {
        let mut games: Vec<String> = self.indexes_ref().keys().cloned().collect();
        games.sort();
        games
    }

    fn indexes_ref(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<GameIndex>>> {
        self.indexes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn indexes_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<GameIndex>>> {
        self.indexes.write().unwrap_or_else(|e| e.into_inner())
    }

    // -------------------------------------------------------------------------
    // Query
    // -------------------------------------------------------------------------

    /// Answer `raw_text` for `game_id` with at most `top_k` fragments.
    ///
    /// Model failures degrade quality but never fail the query; an empty
    /// list is a valid answer.
    ///
    /// # Errors
    ///
    /// Only configuration problems: a missing, unreadable or incompatible
    /// index for `game_id`.
    pub async fn query(
        &self,
        raw_text: &str,
        game_id: &str,
        top_k: usize,
    ) -> Result<Vec<QueryHit>, GkrError> {
        Ok(self.query_detailed(raw_text, game_id, top_k).await?.results)
    }

    /// Like [`query`](Self::query), also returning the processed query,
    /// per-path hit counts, stage timings and score breakdown.
    pub async fn query_detailed(
        &self,
        raw_text: &str,
        game_id: &str,
        top_k: usize,
    ) -> Result<QueryReport, GkrError> {
        let total = Instant::now();
        let index = self.game_index(game_id)?;
        let mut timings = StageTimings::default();

        let start = Instant::now();
        let context = self.processor.process(raw_text, Some(game_id)).await;
        timings.processing_ms = elapsed_ms(start);

        let fusion_config = &self.config.fusion;
        let start = Instant::now();
        let lists = if top_k == 0 {
            Default::default()
        } else {
            self.retriever
                .retrieve(
                    &context,
                    &index,
                    fusion_config.vector_top_k.max(top_k),
                    fusion_config.lexical_top_k.max(top_k),
                )
                .await
        };
        timings.retrieval_ms = elapsed_ms(start);

        let start = Instant::now();
        let fused = fuse(&lists.vector, &lists.lexical, fusion_config)?;
        timings.fusion_ms = elapsed_ms(start);

        let start = Instant::now();
        let reranked = self
            .reranker
            .rerank(&context, &fused, &index.fragments, top_k);
        timings.rerank_ms = elapsed_ms(start);

        let results: Vec<QueryHit> = reranked
            .iter()
            .filter_map(|hit| {
                index.fragments.get(&hit.fragment_id).map(|fragment| QueryHit {
                    fragment_id: hit.fragment_id.clone(),
                    final_score: hit.final_score,
                    fragment: fragment.clone(),
                })
            })
            .collect();
        timings.total_ms = elapsed_ms(total);

        tracing::debug!(
            game_id,
            intent = %context.intent,
            vector = lists.vector.len(),
            lexical = lists.lexical.len(),
            fused = fused.len(),
            results = results.len(),
            total_ms = timings.total_ms,
            "Query complete"
        );

        Ok(QueryReport {
            sub_intent: self.reranker.sub_intent(&context),
            context: (*context).clone(),
            vector_hits: lists.vector.len(),
            lexical_hits: lists.lexical.len(),
            fused_hits: fused.len(),
            timings,
            reranked,
            results,
        })
    }
}
