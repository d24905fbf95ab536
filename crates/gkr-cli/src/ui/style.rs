//! Message styling for CLI output.
//!
//! ## Message Types
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Warning | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |

use gkr_core::IntentLabel;
use owo_colors::OwoColorize;

use super::color::ColorMode;

/// Message severity/type for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Ok,
    Err,
    Warn,
    Info,
    Hint,
}

impl MessageType {
    /// Returns the prefix text for this message type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
        }
    }
}

/// Main styling interface for CLI output.
///
/// # Example
///
/// ```
/// use gkr_cli::ui::{ColorMode, MessageType, Style};
///
/// let style = Style::new(ColorMode::Never);
/// assert_eq!(style.message(MessageType::Ok, "Done"), "[ok] Done");
/// ```
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Default for Style {
    fn default() -> Self {
        Self::new(ColorMode::Auto)
    }
}

impl Style {
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// Format a simple message with a type prefix.
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if self.colors_enabled() {
            let colored_prefix = match msg_type {
                MessageType::Ok => prefix.green().to_string(),
                MessageType::Err => prefix.red().to_string(),
                MessageType::Warn => prefix.yellow().to_string(),
                MessageType::Info => prefix.blue().to_string(),
                MessageType::Hint => prefix.cyan().to_string(),
            };
            format!("{} {}", colored_prefix, text)
        } else {
            format!("{} {}", prefix, text)
        }
    }

    /// Format a section header.
    pub fn section(&self, title: &str) -> String {
        if self.colors_enabled() {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format a structured error with optional cause and hint.
    ///
    /// ```
    /// use gkr_cli::ui::{ColorMode, Style};
    ///
    /// let style = Style::new(ColorMode::Never);
    /// let output = style.error_with_context(
    ///     "Query failed",
    ///     Some("No index found for game `zelda`"),
    ///     Some("Run `gkr games` to list indexed games"),
    /// );
    /// assert!(output.contains("[err] Query failed"));
    /// assert!(output.contains("Cause: No index found"));
    /// ```
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut output = self.message(MessageType::Err, msg);

        if let Some(cause_text) = cause {
            output.push('\n');
            output.push_str(&format!("      Cause: {}", cause_text));
        }

        if let Some(hint_text) = hint {
            output.push('\n');
            output.push_str(&format!("      Hint: {}", hint_text));
        }

        output
    }

    /// Format a key-value pair with a dimmed key.
    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.colors_enabled() {
            format!("{}: {}", key.dimmed(), value)
        } else {
            format!("{}: {}", key, value)
        }
    }

    /// Format a game id (cyan).
    pub fn game(&self, game_id: &str) -> String {
        if self.colors_enabled() {
            game_id.cyan().to_string()
        } else {
            game_id.to_string()
        }
    }

    /// Format an intent label with its confidence.
    pub fn intent(&self, label: IntentLabel, confidence: f32) -> String {
        let text = format!("{} ({:.2})", label, confidence);
        if !self.colors_enabled() {
            return text;
        }
        match label {
            IntentLabel::WikiLookup => text.blue().to_string(),
            IntentLabel::StrategyGuide => text.magenta().to_string(),
            IntentLabel::General => text.dimmed().to_string(),
        }
    }
}
