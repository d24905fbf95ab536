//! CLI definition and command dispatch for `gkr`.
//!
//! ## Configuration Precedence
//!
//! 1. CLI flags (`--config`, `--data-dir`, `--verbose`)
//! 2. Environment variables (`GKR_CONFIG`, `GKR_DATA_DIR`, `GKR_COLOR`)
//! 3. Config file (`~/.gkr/config.yaml` or the `--config` path)
//! 4. Built-in defaults

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::json;

use gkr_core::{game_index_meta, GkrError, RetrievalConfig, RetrievalEngine};

use crate::ui::color::terminal_width;
use crate::ui::format::{format_ms, format_rfc3339_relative};
use crate::ui::table::{
    render_explain_table, render_games_table, render_hits_table, render_metrics_table, GameRow,
};
use crate::ui::{ColorMode, MessageType, Style};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Game Knowledge Retrieval – hybrid search over per-game knowledge indexes
#[derive(Parser, Debug)]
#[command(name = "gkr")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "GKR_VERBOSE", conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, env = "GKR_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.gkr/config.yaml)
    #[arg(long, global = true, env = "GKR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory with one index directory per game (overrides dataDir)
    #[arg(long, global = true, env = "GKR_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Color output mode
    #[arg(long, global = true, env = "GKR_COLOR", value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Retrieve the best knowledge fragments for a question
    #[command(after_help = r#"EXAMPLES:
    # Ask about an enemy
    gkr query "how to kill bile titan" --game helldiver2

    # A window title works as the game
    gkr query "法师职业介绍" --game "Don't Starve Together"

    # Show the score breakdown and stage timings
    gkr query "best terminid loadout" -g helldiver2 --explain

    # Output as JSON for scripting
    gkr query "railgun stats" -g helldiver2 --json | jq '.[0].fragment.topic'
"#)]
    Query {
        /// The player's question
        text: String,

        /// Game id, alias or window title
        #[arg(short, long)]
        game: String,

        /// Number of fragments to return (default: defaultTopK from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Include the processed query, score breakdown and timings
        #[arg(long)]
        explain: bool,
    },

    /// Show how a question is understood (language, intent, rewrite)
    #[command(after_help = r#"EXAMPLES:
    gkr intent "how to kill bile titan" --game helldiver2
    gkr intent "什么是轨道炮" --json
"#)]
    Intent {
        /// The player's question
        text: String,

        /// Game id, alias or window title
        #[arg(short, long)]
        game: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List catalog games and indexed games
    Games {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Map a window title or alias to a game id
    #[command(after_help = r#"EXAMPLES:
    gkr resolve "HELLDIVERS™ 2"
    gkr resolve "ELDEN RING" --json
"#)]
    Resolve {
        /// Window title, alias or id
        title: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Entry point
// ============================================================================

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = format!(
        "gkr_core={lvl},gkr_cli={lvl},gkr_model={lvl},gkr_db={lvl}",
        lvl = log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let style = Style::new(cli.color);

    let engine = match build_engine(&cli) {
        Ok(engine) => engine,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your config at {}", path.display()),
                None => "Check your config at ~/.gkr/config.yaml".to_string(),
            };
            let hint = e
                .downcast_ref::<GkrError>()
                .and_then(hint_for)
                .unwrap_or(hint);
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize retrieval engine",
                    Some(&format!("{e:#}")),
                    Some(&hint),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Query {
            text,
            game,
            top_k,
            json,
            explain,
        } => handle_query(&style, &engine, &text, &game, top_k, json, explain).await,
        Command::Intent { text, game, json } => {
            handle_intent(&style, &engine, &text, game.as_deref(), json).await
        }
        Command::Games { json } => handle_games(&style, &engine, json),
        Command::Resolve { title, json } => handle_resolve(&style, &engine, &title, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", render_error(&style, &e));
            ExitCode::FAILURE
        }
    }
}

fn build_engine(cli: &Cli) -> anyhow::Result<RetrievalEngine> {
    let mut config = match &cli.config {
        Some(path) => RetrievalConfig::from_path(path)?,
        None => RetrievalConfig::load_default()?,
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    Ok(RetrievalEngine::from_config(config)?)
}

/// Top message, the underlying cause chain, and a hint for known errors.
fn render_error(style: &Style, err: &anyhow::Error) -> String {
    let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
    let cause = causes.join(": ");
    let hint = err
        .chain()
        .find_map(|c| c.downcast_ref::<GkrError>())
        .and_then(hint_for);

    style.error_with_context(
        &err.to_string(),
        (!cause.is_empty()).then_some(cause.as_str()),
        hint.as_deref(),
    )
}

fn hint_for(err: &GkrError) -> Option<String> {
    match err {
        GkrError::GameIndexNotFound { .. } => {
            Some("Run `gkr games` to list indexed games, or point --data-dir elsewhere".to_string())
        }
        GkrError::IndexIncompatible { .. } => Some(
            "Rebuild the index with the configured embedding model, or match embedding.dimension"
                .to_string(),
        ),
        GkrError::IndexIo { .. } | GkrError::IndexParse { .. } => {
            Some("The index files are missing or corrupt; rebuild the game index".to_string())
        }
        GkrError::InvalidConfiguration { hint, .. } => Some(hint.clone()),
        GkrError::InvalidConfigFile { path, .. } => {
            Some(format!("Fix or remove {}", path.display()))
        }
        _ => None,
    }
}

/// Accept a game id as is; otherwise try it as an alias or window title.
fn resolve_game_arg(engine: &RetrievalEngine, arg: &str) -> String {
    if engine.catalog().get(arg).is_some() || engine.data_dir().join(arg).is_dir() {
        return arg.to_string();
    }
    match engine.resolve_game(arg) {
        Some(id) => {
            tracing::debug!(title = arg, game_id = id, "Resolved game");
            id.to_string()
        }
        None => arg.to_string(),
    }
}

// ============================================================================
// Command handlers
// ============================================================================

async fn handle_query(
    style: &Style,
    engine: &RetrievalEngine,
    text: &str,
    game: &str,
    top_k: Option<usize>,
    json: bool,
    explain: bool,
) -> anyhow::Result<()> {
    let game_id = resolve_game_arg(engine, game);
    let top_k = top_k.unwrap_or(engine.config().default_top_k);

    if !explain {
        let hits = engine
            .query(text, &game_id, top_k)
            .await
            .with_context(|| format!("Query failed for game `{game_id}`"))?;

        if json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }

        println!("{}", style.section("QUERY"));
        println!();
        println!("  {}", style.key_value("Query", text));
        println!("  {}", style.key_value("Game", &style.game(&game_id)));
        println!();
        if hits.is_empty() {
            println!("{}", style.message(MessageType::Info, "No relevant fragments found."));
        } else {
            println!("{}", render_hits_table(&hits, terminal_width()));
        }
        return Ok(());
    }

    let report = engine
        .query_detailed(text, &game_id, top_k)
        .await
        .with_context(|| format!("Query failed for game `{game_id}`"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let ctx = &report.context;
    println!("{}", style.section("QUERY"));
    println!();
    println!("  {}", style.key_value("Query", text));
    println!("  {}", style.key_value("Game", &style.game(&game_id)));
    println!("  {}", style.key_value("Language", &ctx.language.to_string()));
    if let Some(translated) = &ctx.translated_text {
        println!("  {}", style.key_value("Translated", translated));
    }
    println!("  {}", style.key_value("Rewritten", &ctx.rewritten_text));
    if ctx.lexical_text != ctx.rewritten_text {
        println!("  {}", style.key_value("Lexical", &ctx.lexical_text));
    }
    println!("  {}", style.key_value("Intent", &style.intent(ctx.intent, ctx.confidence)));
    println!(
        "  {}",
        style.key_value(
            "Focus",
            &format!("{} ({:.2})", report.sub_intent.kind, report.sub_intent.confidence)
        )
    );
    println!(
        "  {}",
        style.key_value(
            "Candidates",
            &format!(
                "{} vector, {} lexical, {} fused",
                report.vector_hits, report.lexical_hits, report.fused_hits
            )
        )
    );
    println!();

    if report.results.is_empty() {
        println!("{}", style.message(MessageType::Info, "No relevant fragments found."));
    } else {
        println!("{}", style.section("RESULTS"));
        println!();
        println!("{}", render_hits_table(&report.results, terminal_width()));
        println!();
        println!("{}", style.section("SCORES"));
        println!();
        println!("{}", render_explain_table(&report.reranked));
    }

    let t = report.timings;
    println!();
    println!(
        "{}",
        render_metrics_table(&[
            ("processing", format_ms(t.processing_ms)),
            ("retrieval", format_ms(t.retrieval_ms)),
            ("fusion", format_ms(t.fusion_ms)),
            ("rerank", format_ms(t.rerank_ms)),
            ("total", format_ms(t.total_ms)),
        ])
    );
    Ok(())
}

async fn handle_intent(
    style: &Style,
    engine: &RetrievalEngine,
    text: &str,
    game: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let game_id = game.map(|g| resolve_game_arg(engine, g));
    let ctx = engine.processor().process(text, game_id.as_deref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&*ctx)?);
        return Ok(());
    }

    println!("{}", style.section("INTENT"));
    println!();
    println!("  {}", style.key_value("Query", &ctx.raw_text));
    if let Some(game_id) = &ctx.game_id {
        println!("  {}", style.key_value("Game", &style.game(game_id)));
    }
    println!("  {}", style.key_value("Language", &ctx.language.to_string()));
    if let Some(translated) = &ctx.translated_text {
        println!("  {}", style.key_value("Translated", translated));
    }
    println!("  {}", style.key_value("Rewritten", &ctx.rewritten_text));
    println!("  {}", style.key_value("Intent", &style.intent(ctx.intent, ctx.confidence)));
    println!("  {}", style.key_value("Method", &format!("{:?}", ctx.method).to_lowercase()));
    Ok(())
}

fn handle_games(style: &Style, engine: &RetrievalEngine, json: bool) -> anyhow::Result<()> {
    let indexed = engine.available_games();
    let mut ids: BTreeSet<String> = engine.catalog().ids().map(str::to_string).collect();
    ids.extend(indexed.iter().cloned());

    let rows: Vec<GameRow> = ids
        .into_iter()
        .map(|game_id| {
            let name = engine
                .catalog()
                .get(&game_id)
                .map(|g| g.canonical_name.clone());
            let meta = indexed
                .contains(&game_id)
                .then(|| game_index_meta(engine.data_dir(), &game_id).ok())
                .flatten();
            GameRow {
                name,
                fragments: meta.as_ref().map(|m| m.count),
                dimension: meta.as_ref().map(|m| m.dimension),
                updated: format_rfc3339_relative(
                    meta.as_ref().and_then(|m| m.updated_at.as_deref()),
                ),
                game_id,
            }
        })
        .collect();

    if json {
        let games: Vec<_> = rows
            .iter()
            .map(|r| {
                json!({
                    "gameId": r.game_id,
                    "name": r.name,
                    "indexed": r.fragments.is_some(),
                    "fragments": r.fragments,
                    "dimension": r.dimension,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "dataDir": engine.data_dir(),
                "games": games,
            }))?
        );
        return Ok(());
    }

    println!("{}", style.section("GAMES"));
    println!();
    println!(
        "  {}",
        style.key_value("Data dir", &engine.data_dir().display().to_string())
    );
    println!();
    println!("{}", render_games_table(&rows));
    if indexed.is_empty() {
        println!();
        println!(
            "{}",
            style.message(MessageType::Hint, "No indexed games found; use --data-dir to point at an index directory")
        );
    }
    Ok(())
}

fn handle_resolve(
    style: &Style,
    engine: &RetrievalEngine,
    title: &str,
    json: bool,
) -> anyhow::Result<()> {
    let Some(game_id) = engine.resolve_game(title) else {
        let known: Vec<&str> = engine.catalog().ids().collect();
        bail!(
            "No game matches `{}`. Known games: {}",
            title,
            known.join(", ")
        );
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "title": title, "gameId": game_id }))?
        );
    } else if style.colors_enabled() {
        println!("{}", style.game(game_id));
    } else {
        println!("{game_id}");
    }
    Ok(())
}
