//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `gkr query` | `render_hits_table()` |
//! | `gkr query --explain` | `render_explain_table()`, `render_metrics_table()` |
//! | `gkr games` | `render_games_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use gkr_core::{QueryHit, RerankedHit};

use super::format::{single_line, truncate_str};

/// One row of `gkr games`.
#[derive(Debug, Clone)]
pub struct GameRow {
    pub game_id: String,
    /// Catalog display name, if the game is in the catalog.
    pub name: Option<String>,
    /// Fragment count from the index metadata, if indexed.
    pub fragments: Option<usize>,
    pub dimension: Option<usize>,
    /// Relative time of the last index build.
    pub updated: String,
}

fn rank_cell(rank: Option<usize>) -> Cell {
    Cell::new(rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()))
        .set_alignment(CellAlignment::Right)
}

/// Render ranked query hits.
///
/// ```text
/// #   SCORE   TOPIC        TYPE          SUMMARY
/// 1   0.912   Bile Titan   enemy guide   How to kill a Bile Titan: aim...
/// ```
pub fn render_hits_table(hits: &[QueryHit], width: usize) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("SCORE").set_alignment(CellAlignment::Right),
        Cell::new("TOPIC"),
        Cell::new("TYPE"),
        Cell::new("SUMMARY"),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(2)),
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),
        ColumnConstraint::LowerBoundary(Width::Fixed(10)),
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),
        ColumnConstraint::LowerBoundary(Width::Fixed(20)),
    ]);

    let summary_width = width.saturating_sub(60).max(20);
    for (i, hit) in hits.iter().enumerate() {
        let fragment = &hit.fragment;
        let content_type = if fragment.content_type.is_empty() {
            "-"
        } else {
            fragment.content_type.as_str()
        };
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", hit.final_score)).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&fragment.topic, 28)),
            Cell::new(content_type),
            Cell::new(truncate_str(&single_line(&fragment.summary), summary_width)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render the score breakdown of reranked hits.
///
/// ```text
/// FRAGMENT               FINAL   INTENT   SEMANTIC   FUSION   VEC   LEX
/// hd2-bile-titan-guide   0.912    1.000      0.984   0.0164     2     1
/// ```
pub fn render_explain_table(hits: &[RerankedHit]) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("FRAGMENT"),
        Cell::new("FINAL").set_alignment(CellAlignment::Right),
        Cell::new("INTENT").set_alignment(CellAlignment::Right),
        Cell::new("SEMANTIC").set_alignment(CellAlignment::Right),
        Cell::new("FUSION").set_alignment(CellAlignment::Right),
        Cell::new("VEC").set_alignment(CellAlignment::Right),
        Cell::new("LEX").set_alignment(CellAlignment::Right),
    ]);

    for hit in hits {
        table.add_row(vec![
            Cell::new(truncate_str(hit.fragment_id.as_str(), 32)),
            Cell::new(format!("{:.3}", hit.final_score)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", hit.intent_component)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", hit.semantic_component)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", hit.fused.fusion_score)).set_alignment(CellAlignment::Right),
            rank_cell(hit.fused.vector_rank),
            rank_cell(hit.fused.lexical_rank),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render the games known to the catalog or present on disk.
///
/// ```text
/// GAME         NAME            FRAGMENTS   DIM    UPDATED
/// helldiver2   Helldivers 2          412   1024   2d ago
/// eldenring    Elden Ring              -      -   -
/// ```
pub fn render_games_table(games: &[GameRow]) -> String {
    if games.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("GAME"),
        Cell::new("NAME"),
        Cell::new("FRAGMENTS").set_alignment(CellAlignment::Right),
        Cell::new("DIM").set_alignment(CellAlignment::Right),
        Cell::new("UPDATED"),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(10)),
        ColumnConstraint::LowerBoundary(Width::Fixed(12)),
        ColumnConstraint::LowerBoundary(Width::Fixed(9)),
        ColumnConstraint::LowerBoundary(Width::Fixed(4)),
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),
    ]);

    let or_dash = |v: Option<usize>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
    for game in games {
        table.add_row(vec![
            Cell::new(&game.game_id),
            Cell::new(game.name.as_deref().unwrap_or("-")),
            Cell::new(or_dash(game.fragments)).set_alignment(CellAlignment::Right),
            Cell::new(or_dash(game.dimension)).set_alignment(CellAlignment::Right),
            Cell::new(&game.updated),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render a simple two-column metrics table.
///
/// ```text
/// STAGE        TIME
/// processing   0.4ms
/// retrieval    12.1ms
/// ```
pub fn render_metrics_table(metrics: &[(&str, String)]) -> String {
    if metrics.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("STAGE"),
        Cell::new("TIME").set_alignment(CellAlignment::Right),
    ]);

    for (key, value) in metrics {
        table.add_row(vec![
            Cell::new(*key),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}
