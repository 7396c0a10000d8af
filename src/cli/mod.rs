//! CLI layer for news-nexus.
//!
//! Provides the command-line interface using clap, with commands for
//! ingesting documents, probing retrieval, and driving pipeline runs.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
