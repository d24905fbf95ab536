//! Shared fixtures for gkr-core integration tests.
//!
//! A small Helldivers 2 index written to a temp directory, a keyword-axis
//! embedding model and a scripted completion model.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gkr_core::bm25::{save_bm25_index, Bm25Config, Bm25Index};
use gkr_core::index::vectors_dir_for_game;
use gkr_core::{CallPolicy, RetrievalConfig};
use gkr_db::vector::{
    open_vector_index, write_index_meta, VectorIndexConfig, VectorIndexMeta, VectorInsert,
    VectorMetric, DEFAULT_BACKEND,
};
use gkr_db::{FragmentStore, KnowledgeFragment};
use gkr_model::{CompletionModel, EmbeddingModel, ModelError, ModelResult};

pub const GAME_ID: &str = "helldiver2";

/// Embedding axes: one per topic word group, plus a constant bias so no
/// vector is zero.
const AXES: [&[&str]; 4] = [
    &["titan", "泰坦"],
    &["charger", "冲锋者"],
    &["railgun", "weapon", "anti-tank"],
    &["loadout", "build", "mage", "class"],
];

pub const DIMENSION: usize = AXES.len();

pub fn axis_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    AXES.iter()
        .map(|words| 0.1 + words.iter().filter(|w| lower.contains(*w)).count() as f32)
        .collect()
}

pub fn helldivers_fragments() -> Vec<KnowledgeFragment> {
    vec![
        KnowledgeFragment::new(
            "hd2-bile-titan-guide",
            "Bile Titan",
            "How to kill a Bile Titan: aim anti-tank weapons at the head and pop the belly sacs. Strategy: keep moving and use orbital stratagems.",
        )
        .with_keywords(["bile titan", "weak point", "anti-tank"])
        .with_content_type("enemy guide"),
        KnowledgeFragment::new(
            "hd2-bile-titan-stats",
            "Bile Titan stats",
            "Bile Titan health 4000, head armor class 4, acid spew range 20m.",
        )
        .with_keywords(["bile titan", "stats"])
        .with_content_type("stats"),
        KnowledgeFragment::new(
            "hd2-charger",
            "Charger",
            "Chargers rush in a straight line. Dodge sideways and shoot the exposed rear legs.",
        )
        .with_keywords(["charger", "weak point"])
        .with_content_type("enemy guide"),
        KnowledgeFragment::new(
            "hd2-railgun",
            "Railgun",
            "The Railgun is a support weapon with medium armor penetration, stronger in unsafe mode.",
        )
        .with_keywords(["railgun", "support weapon"])
        .with_content_type("basic info"),
        KnowledgeFragment::new(
            "hd2-terminid-loadout",
            "Best loadout against Terminids",
            "Recommended build: Quasar Cannon, Eagle Airstrike, Orbital Laser and the Breaker Incendiary.",
        )
        .with_keywords(["loadout", "build", "terminids"])
        .with_content_type("build recommendation"),
    ]
}

/// Write a complete game index for `fragments` under `data_dir/game_id`.
pub fn write_game(data_dir: &Path, game_id: &str, fragments: &[KnowledgeFragment]) {
    let root = data_dir.join(game_id);
    let vectors_dir = vectors_dir_for_game(&root);

    FragmentStore::write(&vectors_dir, fragments).expect("write fragments");

    let mut meta = VectorIndexMeta::new(DEFAULT_BACKEND, DIMENSION, VectorMetric::Cosine);
    meta.update_count(fragments.len());
    write_index_meta(&vectors_dir, &meta).expect("write vector meta");

    let config = VectorIndexConfig::from_meta(&meta, &vectors_dir).with_create_if_missing(true);
    let index = open_vector_index(&config).expect("open vector index");
    let inserts: Vec<VectorInsert> = fragments
        .iter()
        .map(|f| VectorInsert::new(f.id.as_str(), axis_vector(&f.search_text())))
        .collect();
    index.upsert(&inserts).expect("upsert vectors");
    index.flush().expect("flush vectors");

    let mut bm25 = Bm25Index::new(Bm25Config::default());
    for f in fragments {
        bm25.add_document(f.id.to_string(), &f.search_text());
    }
    save_bm25_index(&bm25, &root).expect("save bm25");
}

pub fn write_helldivers(data_dir: &Path) {
    write_game(data_dir, GAME_ID, &helldivers_fragments());
}

/// Config pointing at `data_dir` with fast, single-attempt model calls.
pub fn test_config(data_dir: &Path) -> RetrievalConfig {
    let mut config = RetrievalConfig {
        data_dir: Some(data_dir.to_path_buf()),
        ..RetrievalConfig::default()
    };
    let fast = CallPolicy {
        max_attempts: 1,
        initial_backoff_ms: 0,
        backoff_multiplier: 1.0,
        max_backoff_ms: 0,
        timeout_ms: 2_000,
    };
    config.calls.completion = fast.clone();
    config.calls.embedding = fast;
    config
}

// ============================================================================
// Model stubs
// ============================================================================

#[derive(Debug)]
pub struct AxisEmbedding {
    fail: bool,
    dimension: usize,
}

impl AxisEmbedding {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            dimension: DIMENSION,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            dimension: DIMENSION,
        })
    }

    pub fn with_dimension(dimension: usize) -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingModel for AxisEmbedding {
    async fn embed(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>> {
        if self.fail {
            return Err(ModelError::embedding_failed("axis", "connection refused"));
        }
        Ok(texts.iter().map(|t| axis_vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "axis"
    }
}

/// Completion stub answering with a fixed reply, or failing.
#[derive(Debug)]
pub struct ScriptedCompletion {
    reply: Option<String>,
    calls: AtomicU32,
}

impl ScriptedCompletion {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionModel for ScriptedCompletion {
    async fn complete(&self, _prompt: &str) -> ModelResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| ModelError::completion_failed("scripted", "connection refused"))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}
