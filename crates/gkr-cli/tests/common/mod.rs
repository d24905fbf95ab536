//! Shared test utilities for gkr-cli integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use gkr_core::bm25::{save_bm25_index, Bm25Config, Bm25Index};
use gkr_core::index::vectors_dir_for_game;
use gkr_db::vector::{
    open_vector_index, write_index_meta, VectorIndexConfig, VectorIndexMeta, VectorInsert,
    VectorMetric, DEFAULT_BACKEND,
};
use gkr_db::{FragmentStore, KnowledgeFragment};
use tempfile::TempDir;

/// Get a Command for the gkr binary.
///
/// # Panics
///
/// Panics if the gkr binary cannot be found. This should not happen
/// in a properly configured test environment.
#[allow(deprecated)]
pub fn gkr_cmd() -> Command {
    Command::cargo_bin("gkr").expect("gkr binary should exist")
}

/// A temp data dir with an indexed `helldiver2`, plus a config path that
/// does not exist so the built-in defaults apply.
pub struct Fixture {
    pub temp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        write_game(&temp.path().join("data"), "helldiver2", &helldivers_fragments());
        Self { temp }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp.path().join("config.yaml")
    }

    /// `gkr` with isolated config, data dir and no colors.
    pub fn cmd(&self) -> Command {
        let mut cmd = gkr_cmd();
        cmd.env_remove("GKR_VERBOSE")
            .env("NO_COLOR", "1")
            .arg("--config")
            .arg(self.config_path())
            .arg("--data-dir")
            .arg(self.data_dir())
            .arg("--color")
            .arg("never");
        cmd
    }
}

pub fn helldivers_fragments() -> Vec<KnowledgeFragment> {
    vec![
        KnowledgeFragment::new(
            "hd2-bile-titan-guide",
            "Bile Titan",
            "How to kill a Bile Titan: aim anti-tank weapons at the head and pop the belly sacs.",
        )
        .with_keywords(["bile titan", "weak point"])
        .with_content_type("enemy guide"),
        KnowledgeFragment::new(
            "hd2-charger",
            "Charger",
            "Chargers rush in a straight line. Dodge sideways and shoot the rear legs.",
        )
        .with_keywords(["charger"])
        .with_content_type("enemy guide"),
        KnowledgeFragment::new(
            "hd2-railgun",
            "Railgun",
            "The Railgun is a support weapon with medium armor penetration.",
        )
        .with_keywords(["railgun", "support weapon"])
        .with_content_type("basic info"),
    ]
}

/// Write a complete game index under `data_dir/game_id`.
pub fn write_game(data_dir: &Path, game_id: &str, fragments: &[KnowledgeFragment]) {
    let root = data_dir.join(game_id);
    let vectors_dir = vectors_dir_for_game(&root);

    FragmentStore::write(&vectors_dir, fragments).expect("write fragments");

    let mut meta = VectorIndexMeta::new(DEFAULT_BACKEND, 4, VectorMetric::Cosine);
    meta.update_count(fragments.len());
    write_index_meta(&vectors_dir, &meta).expect("write vector meta");

    let config = VectorIndexConfig::from_meta(&meta, &vectors_dir).with_create_if_missing(true);
    let index = open_vector_index(&config).expect("open vector index");
    let inserts: Vec<VectorInsert> = fragments
        .iter()
        .enumerate()
        .map(|(i, f)| VectorInsert::new(f.id.as_str(), vec![1.0 + i as f32; 4]))
        .collect();
    index.upsert(&inserts).expect("upsert vectors");
    index.flush().expect("flush vectors");

    let mut bm25 = Bm25Index::new(Bm25Config::default());
    for f in fragments {
        bm25.add_document(f.id.to_string(), &f.search_text());
    }
    save_bm25_index(&bm25, &root).expect("save bm25");
}
