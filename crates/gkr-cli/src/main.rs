//! # gkr CLI
//!
//! Command-line interface for Game Knowledge Retrieval.
//!
//! Run `gkr --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    cli::run().await
}
