//! Query understanding: language detection, translation, intent
//! classification and rewriting.
//!
//! [`QueryProcessor::process`] turns raw player text into a [`QueryContext`].
//! It never fails; every external step has a deterministic fallback.

mod analysis;
mod cache;
mod context;
mod language;
mod processor;
mod rewrite;

pub use analysis::{build_analysis_prompt, parse_analysis, strip_code_fences, LlmAnalysis};
pub use cache::QueryCache;
pub use context::{ProcessingMethod, QueryContext, Translation};
pub use language::{detect_language, Language, CJK_RATIO_THRESHOLD};
pub use processor::{ProcessorStats, QueryProcessingConfig, QueryProcessor};
pub use rewrite::{ensure_game_name, GuidanceRule, RewriteConfig};
