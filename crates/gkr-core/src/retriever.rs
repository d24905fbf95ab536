//! Dual retrieval: dense vector search and weighted BM25, run concurrently.
//!
//! Neither path can fail the query. A missing or failing embedding model
//! empties the vector list; a lexical task failure empties the lexical list.
//! Each degradation is logged as a warning.

use std::sync::Arc;

use gkr_db::FragmentId;
use gkr_model::EmbeddingModel;
use serde::Serialize;

use crate::external::CallPolicy;
use crate::game::{GameCatalog, WeightedPhrase};
use crate::index::GameIndex;
use crate::lexical::LexicalQuery;
use crate::query::QueryContext;

/// Which retriever produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HitSource {
    Vector,
    Lexical,
}

/// One ranked hit from a single retriever.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub fragment_id: FragmentId,
    /// Cosine similarity or BM25 score; only comparable within one list.
    pub raw_score: f32,
    /// 1 = best.
    pub rank: usize,
    pub source: HitSource,
}

impl RetrievalHit {
    pub fn new(
        fragment_id: impl Into<FragmentId>,
        raw_score: f32,
        rank: usize,
        source: HitSource,
    ) -> Self {
        Self {
            fragment_id: fragment_id.into(),
            raw_score,
            rank,
            source,
        }
    }
}

/// Both ranked lists, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalLists {
    pub vector: Vec<RetrievalHit>,
    pub lexical: Vec<RetrievalHit>,
}

/// Issues the rewritten query against a game's vector and BM25 indexes.
#[derive(Debug)]
pub struct DualRetriever {
    embedder: Option<Arc<dyn EmbeddingModel>>,
    policy: CallPolicy,
    catalog: Arc<GameCatalog>,
}

impl DualRetriever {
    pub fn new(catalog: Arc<GameCatalog>, policy: CallPolicy) -> Self {
        Self {
            embedder: None,
            policy,
            catalog,
        }
    }

    pub fn with_embedding_model(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        self.embedder = Some(model);
        self
    }

    /// Retrieve up to `vector_top_k` and `lexical_top_k` hits for `ctx`.
    ///
    /// The vector side embeds `ctx.rewritten_text`; the BM25 side searches
    /// `ctx.lexical_text`.
    pub async fn retrieve(
        &self,
        ctx: &QueryContext,
        index: &Arc<GameIndex>,
        vector_top_k: usize,
        lexical_top_k: usize,
    ) -> RetrievalLists {
        let (vector, lexical) = tokio::join!(
            self.vector_search(&ctx.rewritten_text, index, vector_top_k),
            self.lexical_search(ctx, index, lexical_top_k),
        );

        tracing::debug!(
            vector = vector.len(),
            lexical = lexical.len(),
            "Dual retrieval finished"
        );
        RetrievalLists { vector, lexical }
    }

    async fn vector_search(
        &self,
        text: &str,
        index: &GameIndex,
        top_k: usize,
    ) -> Vec<RetrievalHit> {
        if top_k == 0 || text.trim().is_empty() {
            return Vec::new();
        }
        let Some(model) = self.embedder.as_ref() else {
            tracing::warn!("No embedding model configured; vector retrieval skipped");
            return Vec::new();
        };

        let embedding = self
            .policy
            .call_or(
                "embedding",
                || {
                    let model = Arc::clone(model);
                    let text = text.to_string();
                    async move { model.embed_one(&text).await }
                },
                Vec::new(),
            )
            .await;
        if embedding.is_empty() {
            return Vec::new();
        }

        match index.vectors.query(&embedding, top_k) {
            Ok(results) => results
                .into_iter()
                .enumerate()
                .map(|(i, r)| RetrievalHit::new(r.id, r.score, i + 1, HitSource::Vector))
                .collect(),
            Err(e) => {
                tracing::warn!(game_id = %index.game_id, error = %e, "Vector query failed");
                Vec::new()
            }
        }
    }

    async fn lexical_search(
        &self,
        ctx: &QueryContext,
        index: &Arc<GameIndex>,
        top_k: usize,
    ) -> Vec<RetrievalHit> {
        if top_k == 0 {
            return Vec::new();
        }

        let index = Arc::clone(index);
        let catalog = Arc::clone(&self.catalog);
        let text = ctx.lexical_text.clone();
        let game_id = ctx.game_id.clone();

        let task = tokio::task::spawn_blocking(move || {
            let phrases: Vec<&WeightedPhrase> = catalog.phrases_for(game_id.as_deref()).collect();
            let query = LexicalQuery::build(&text, &index.lexical.tokenizer(), &phrases);
            index.lexical.search_weighted(query.terms(), top_k)
        });

        match task.await {
            Ok(results) => results
                .into_iter()
                .map(|r| RetrievalHit::new(r.doc_id, r.score, r.rank, HitSource::Lexical))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Lexical search task failed");
                Vec::new()
            }
        }
    }
}
