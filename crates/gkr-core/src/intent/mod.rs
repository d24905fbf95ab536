//! Intent taxonomy and deterministic classification.
//!
//! Three labels ([`IntentLabel`]): wiki lookups, strategy guides and the
//! general default. Each carries an [`IntentProfile`] with trigger keywords,
//! regex patterns, the game phrase categories that count as triggers, its
//! preferred fragment content types and its rerank weights.
//!
//! The taxonomy is configuration data. [`TaxonomyConfig`] is the serde view
//! (`intents:` in the config file); [`IntentTaxonomy`] is the validated,
//! compiled form shared by the query processor and the reranker.

mod classifier;
mod taxonomy;

pub use classifier::Classification;
pub(crate) use taxonomy::compile_pattern;
pub use taxonomy::{
    IntentLabel, IntentProfile, IntentProfileConfig, IntentTaxonomy, TaxonomyConfig,
    WeightProfile,
};
