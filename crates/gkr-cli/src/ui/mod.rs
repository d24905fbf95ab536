//! # CLI UI Module
//!
//! Styling and formatting for `gkr` output. Colors respect `NO_COLOR` and
//! every command has a `--json` form for scripting.
//!
//! - `color`: color mode and terminal capability checks
//! - `style`: message prefixes and styled values
//! - `format`: truncation and time formatting
//! - `table`: comfy-table renderers

pub mod color;
pub mod format;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use style::{MessageType, Style};
