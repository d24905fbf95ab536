//! End-to-end tests for the `gkr` binary against a temp index.
//!
//! No model providers are configured, so every query runs the
//! deterministic path with BM25 retrieval only.

mod common;

use common::{gkr_cmd, Fixture};
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    gkr_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("intent"))
        .stdout(predicate::str::contains("games"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_version() {
    gkr_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_query_json() {
    let fx = Fixture::new();
    let output = fx
        .cmd()
        .args(["query", "how to kill bile titan", "--game", "helldiver2", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let hits: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let hits = hits.as_array().unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0]["fragmentId"], "hd2-bile-titan-guide");
    assert_eq!(hits[0]["fragment"]["topic"], "Bile Titan");
}

#[test]
fn test_query_accepts_window_title() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["query", "railgun", "--game", "HELLDIVERS 2", "-k", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("helldiver2"))
        .stdout(predicate::str::contains("Railgun"));
}

#[test]
fn test_query_explain_shows_breakdown() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["query", "charger legs", "-g", "helldiver2", "--explain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SCORES"))
        .stdout(predicate::str::contains("hd2-charger"))
        .stdout(predicate::str::contains("Focus: general"))
        .stdout(predicate::str::contains("total"));
}

#[test]
fn test_query_explain_json_has_context() {
    let fx = Fixture::new();
    let output = fx
        .cmd()
        .args(["query", "charger", "-g", "helldiver2", "--explain", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["context"]["language"], "latin");
    assert_eq!(report["context"]["method"], "deterministic");
    assert_eq!(report["vectorHits"], 0);
    assert_eq!(report["subIntent"]["kind"], "general");
    assert_eq!(report["context"]["lexicalText"], "charger");
}

#[test]
fn test_query_unknown_game_fails_with_hint() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["query", "anything", "--game", "zelda"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("zelda"))
        .stderr(predicate::str::contains("gkr games"));
}

#[test]
fn test_intent_json() {
    let fx = Fixture::new();
    let output = fx
        .cmd()
        .args(["intent", "what is the railgun", "--game", "helldiver2", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let ctx: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ctx["rawText"], "what is the railgun");
    assert_eq!(ctx["gameId"], "helldiver2");
    assert!(ctx["rewrittenText"].as_str().unwrap().contains("railgun"));
}

#[test]
fn test_games_json_merges_catalog_and_indexes() {
    let fx = Fixture::new();
    let output = fx.cmd().args(["games", "--json"]).output().unwrap();
    assert!(output.status.success());

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let games = listing["games"].as_array().unwrap();

    let hd2 = games.iter().find(|g| g["gameId"] == "helldiver2").unwrap();
    assert_eq!(hd2["indexed"], true);
    assert_eq!(hd2["fragments"], 3);
    assert_eq!(hd2["dimension"], 4);

    let dst = games.iter().find(|g| g["gameId"] == "dst").unwrap();
    assert_eq!(dst["indexed"], false);
}

#[test]
fn test_games_table() {
    let fx = Fixture::new();
    fx.cmd()
        .arg("games")
        .assert()
        .success()
        .stdout(predicate::str::contains("helldiver2"))
        .stdout(predicate::str::contains("Helldivers 2"));
}

#[test]
fn test_resolve_window_title() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["resolve", "HELLDIVERS 2"])
        .assert()
        .success()
        .stdout("helldiver2\n");
}

#[test]
fn test_resolve_unknown_title_fails() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["resolve", "Untitled - Notepad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No game matches"));
}

#[test]
fn test_invalid_config_file_fails() {
    let fx = Fixture::new();
    std::fs::write(fx.config_path(), "fusion: [not, a, map").unwrap();
    fx.cmd()
        .arg("games")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to initialize retrieval engine"));
}
