//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default database path, shared by the vector store and checkpoints.
pub const DEFAULT_DB_PATH: &str = ".news-nexus/news-nexus.db";
/// Default directory scanned by `ingest`.
pub const DEFAULT_DATA_DIR: &str = "data/raw_pdfs";

/// news-nexus: research, analyze and write a newsletter with local LLMs.
///
/// Internal PDFs are ingested into a vector store; a researcher agent
/// combines them with web and RSS results, an analyst extracts trends and a
/// writer produces an HTML newsletter, optionally reviewed by a human.
#[derive(Parser, Debug)]
#[command(name = "news-nexus")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the database file.
    ///
    /// Defaults to `.news-nexus/news-nexus.db` in the current directory.
    #[arg(short, long, env = "NEWS_NEXUS_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Directory holding the PDFs to ingest.
    #[arg(long, env = "NEWS_NEXUS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory containing prompt template overrides.
    #[arg(long, env = "NEWS_NEXUS_PROMPT_DIR", global = true)]
    pub prompt_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest every PDF in the data directory into the vector store.
    #[command(after_help = r#"Examples:
  news-nexus ingest                           # Ingest ./data/raw_pdfs
  news-nexus --data-dir ~/policies ingest     # Ingest another directory
"#)]
    Ingest,

    /// Query the vector store directly.
    ///
    /// Prints the top documents with score, source and a content snippet.
    /// Scores are distances: lower is closer.
    #[command(after_help = r#"Examples:
  news-nexus search "remote work policy"
  news-nexus search "GenAI productivity" -k 8 --no-boost
"#)]
    Search {
        /// Search query text.
        query: String,

        /// Maximum number of results.
        #[arg(short = 'k', long, default_value = "4")]
        top_k: usize,

        /// Keep the store's ordering instead of boosting keyword matches.
        #[arg(long)]
        no_boost: bool,
    },

    /// Run the pipeline for a topic.
    #[command(after_help = r#"Examples:
  news-nexus run "AI trends 2026"
  news-nexus run "AI trends 2026" --approval              # Stop for review
  news-nexus run "AI trends 2026" --approval --thread-id weekly-42
"#)]
    Run {
        /// Topic to research.
        topic: String,

        /// Suspend for human approval after the first draft.
        #[arg(long)]
        approval: bool,

        /// Thread identifier (generated when omitted).
        #[arg(long)]
        thread_id: Option<String>,
    },

    /// Resume a suspended run with feedback.
    ///
    /// Feedback containing "approve" finishes the run; anything else is sent
    /// to the writer for another draft.
    #[command(after_help = r#"Examples:
  news-nexus resume weekly-42 "please shorten the intro"
  news-nexus resume weekly-42 approve
"#)]
    Resume {
        /// Thread identifier printed by `run`.
        thread_id: String,

        /// Feedback message.
        feedback: String,
    },

    /// Show the current draft of a run.
    Show {
        /// Thread identifier.
        thread_id: String,
    },

    /// Run the pipeline and review drafts interactively.
    ///
    /// Prints each draft and reads feedback from stdin until it contains
    /// "approve".
    Review {
        /// Topic to research.
        topic: String,

        /// Thread identifier (generated when omitted).
        #[arg(long)]
        thread_id: Option<String>,
    },

    /// Discard the checkpoint of a single run.
    Delete {
        /// Thread identifier.
        thread_id: String,
    },

    /// Delete checkpoints not updated within the given window.
    Prune {
        /// Age threshold in hours.
        #[arg(long, default_value = "168")]
        older_than_hours: u32,
    },

    /// Write default prompt templates to a directory for customization.
    ///
    /// Skips files that already exist.
    #[command(after_help = r#"Examples:
  news-nexus init-prompts                  # Write to the user config dir
  news-nexus init-prompts --dir ./prompts  # Write to a custom directory
"#)]
    InitPrompts {
        /// Target directory (defaults to the user config dir).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }

    /// Returns the ingest directory, using the default if not specified.
    #[must_use]
    pub fn get_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }
}
