//! Game catalog: which games exist, how to recognize them from a window title,
//! and which domain phrases matter for each.
//!
//! The built-in catalog is compiled in from `games.yaml`. A config file can
//! point `catalogPath` at a replacement with the same shape.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::GkrError;
use crate::text::contains_term;

const BUILTIN_CATALOG: &str = include_str!("games.yaml");

/// Category of a weighted phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhraseCategory {
    #[default]
    Common,
    Enemy,
    Tactical,
    Item,
    Special,
}

impl fmt::Display for PhraseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Common => "common",
            Self::Enemy => "enemy",
            Self::Tactical => "tactical",
            Self::Item => "item",
            Self::Special => "special",
        };
        f.write_str(s)
    }
}

/// A domain phrase and its lexical boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPhrase {
    pub phrase: String,
    pub weight: f32,
    #[serde(default)]
    pub category: PhraseCategory,
}

/// One supported game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameProfile {
    /// Directory name under the data dir, e.g. `helldiver2`.
    pub id: String,
    /// Display name, e.g. "Helldivers 2".
    pub canonical_name: String,
    /// Window titles and alternative spellings.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub phrases: Vec<WeightedPhrase>,
}

/// All known games plus phrases shared by every game.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameCatalog {
    #[serde(default)]
    pub common: Vec<WeightedPhrase>,
    #[serde(default)]
    pub games: Vec<GameProfile>,
}

impl GameCatalog {
    /// The compiled-in catalog.
    pub fn builtin() -> Result<Self, GkrError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog document.
    pub fn from_yaml_str(content: &str) -> Result<Self, GkrError> {
        let catalog: Self = serde_yaml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file.
    pub fn from_path(path: &Path) -> Result<Self, GkrError> {
        let content = std::fs::read_to_string(path).map_err(|e| GkrError::InvalidConfigFile {
            path: path.to_path_buf(),
            message: format!("Failed to read game catalog: {e}"),
        })?;
        Self::from_yaml_str(&content).map_err(|e| GkrError::InvalidConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn validate(&self) -> Result<(), GkrError> {
        let mut seen = std::collections::HashSet::new();
        for game in &self.games {
            if game.id.trim().is_empty() {
                return Err(GkrError::invalid_configuration(
                    "game catalog entry has an empty id",
                    "Every game needs an `id` matching its index directory",
                ));
            }
            if !seen.insert(game.id.as_str()) {
                return Err(GkrError::invalid_configuration(
                    format!("game `{}` is listed twice in the catalog", game.id),
                    "Remove the duplicate entry",
                ));
            }
        }
        let all_phrases = self
            .common
            .iter()
            .chain(self.games.iter().flat_map(|g| g.phrases.iter()));
        for p in all_phrases {
            if !(p.weight.is_finite() && p.weight > 0.0) {
                return Err(GkrError::invalid_configuration(
                    format!("phrase `{}` has non-positive weight {}", p.phrase, p.weight),
                    "Phrase weights must be greater than 0",
                ));
            }
        }
        Ok(())
    }

    /// Look up a game by exact id.
    pub fn get(&self, game_id: &str) -> Option<&GameProfile> {
        self.games.iter().find(|g| g.id == game_id)
    }

    /// Catalog game ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.games.iter().map(|g| g.id.as_str())
    }

    /// Map a window title, alias or id to a game id.
    ///
    /// Case-insensitive exact match on id or alias first, then the first
    /// game with an alias contained in the title.
    pub fn resolve(&self, title_or_id: &str) -> Option<&str> {
        let needle = title_or_id.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let exact = self.games.iter().find(|g| {
            g.id.to_lowercase() == needle || g.aliases.iter().any(|a| a.to_lowercase() == needle)
        });
        if let Some(game) = exact {
            return Some(&game.id);
        }

        self.games
            .iter()
            .find(|g| g.aliases.iter().any(|a| contains_term(&needle, a)))
            .map(|g| g.id.as_str())
    }

    /// Phrases that apply to `game_id`: the game's own table followed by the
    /// common phrases. Unknown or absent games get only the common phrases.
    pub fn phrases_for<'a>(
        &'a self,
        game_id: Option<&str>,
    ) -> impl Iterator<Item = &'a WeightedPhrase> + 'a {
        let own = game_id
            .and_then(|id| self.get(id))
            .map(|g| g.phrases.as_slice())
            .unwrap_or(&[]);
        own.iter().chain(self.common.iter())
    }
}
