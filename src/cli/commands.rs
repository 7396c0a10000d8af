//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Async work runs on a
//! runtime created per command.

#![allow(clippy::uninlined_format_args)]

use std::fmt::Write as FmtWrite;
use std::io::{self, BufRead, Write as IoWrite};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::agent::checkpoint::{CheckpointStore, MemoryCheckpointStore, SqliteCheckpointStore};
use crate::agent::client::create_provider;
use crate::agent::config::AgentConfig;
use crate::agent::executor::ToolExecutor;
use crate::agent::graph::{Pipeline, RunOutcome};
use crate::agent::prompt::PromptSet;
use crate::cli::output::{OutputFormat, snippet};
use crate::cli::parser::{Cli, Commands};
use crate::core::RetrievedDocument;
use crate::error::{AgentError, CommandError, Result};
use crate::ingest::ingest_directory;
use crate::retrieval::{OllamaEmbedder, Retriever, SqliteVectorStore};
use crate::tools::{DuckDuckGoSearch, HttpFeedFetcher};

/// Characters of chunk content shown per search result.
const SNIPPET_LEN: usize = 200;

/// Executes the CLI command.
///
/// Returns the text to print on stdout.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Ingest => cmd_ingest(cli, &db_path, &cli.get_data_dir(), format),
        Commands::Search {
            query,
            top_k,
            no_boost,
        } => cmd_search(cli, &db_path, query, *top_k, !*no_boost, format),
        Commands::Run {
            topic,
            approval,
            thread_id,
        } => cmd_run(cli, &db_path, topic, *approval, thread_id.as_deref(), format),
        Commands::Resume {
            thread_id,
            feedback,
        } => cmd_resume(cli, &db_path, thread_id, feedback, format),
        Commands::Show { thread_id } => cmd_show(&db_path, thread_id, format),
        Commands::Review { topic, thread_id } => {
            cmd_review(cli, &db_path, topic, thread_id.as_deref())
        }
        Commands::Delete { thread_id } => cmd_delete(&db_path, thread_id, format),
        Commands::Prune { older_than_hours } => cmd_prune(&db_path, *older_than_hours, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Creates a tokio runtime as sync/async bridge.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Builds agent configuration from env + CLI overrides.
fn agent_config(cli: &Cli, human_approval: bool) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder()
        .from_env()
        .human_approval(human_approval);
    if let Some(dir) = &cli.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

fn open_vector_store(db_path: &Path, config: &AgentConfig) -> Result<SqliteVectorStore> {
    let embedder = OllamaEmbedder::new(&config.embed_url, &config.embed_model, config.timeout)?;
    Ok(SqliteVectorStore::open(db_path, Arc::new(embedder))?)
}

fn build_pipeline(
    db_path: &Path,
    config: &AgentConfig,
    checkpoints: Arc<dyn CheckpointStore>,
) -> Result<Pipeline> {
    let provider = create_provider(config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    let store = open_vector_store(db_path, config)?;
    let executor = ToolExecutor::new(
        Retriever::new(Arc::new(store)),
        Arc::new(DuckDuckGoSearch::new(config.timeout)?),
        Arc::new(HttpFeedFetcher::new(config.timeout)?),
        config.feeds.clone(),
    );
    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    Ok(Pipeline::new(config, &prompts, provider, executor, checkpoints))
}

fn checkpoint_store(db_path: &Path) -> Result<Arc<dyn CheckpointStore>> {
    Ok(Arc::new(SqliteCheckpointStore::open(db_path)?))
}

fn non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommandError::InvalidArgument(format!("{what} must not be empty")).into());
    }
    Ok(trimmed)
}

// ==================== Retrieval Commands ====================

fn cmd_ingest(cli: &Cli, db_path: &Path, data_dir: &Path, format: OutputFormat) -> Result<String> {
    let config = agent_config(cli, false)?;
    let store = open_vector_store(db_path, &config)?;
    let report = runtime()?.block_on(ingest_directory(data_dir, &store))?;

    match format {
        OutputFormat::Text => {
            if report.documents == 0 && report.skipped.is_empty() {
                return Ok(format!("No PDFs found in {}\n", data_dir.display()));
            }
            let mut output = format!(
                "Ingested {} document(s) into {} chunk(s)\n",
                report.documents, report.chunks
            );
            for (path, reason) in &report.skipped {
                let _ = writeln!(output, "  skipped {}: {}", path.display(), reason);
            }
            Ok(output)
        }
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "data_dir": data_dir.to_string_lossy(),
            "documents": report.documents,
            "chunks": report.chunks,
            "skipped": report.skipped.iter().map(|(p, reason)| serde_json::json!({
                "path": p.to_string_lossy(),
                "reason": reason,
            })).collect::<Vec<_>>(),
        }))),
    }
}

fn cmd_search(
    cli: &Cli,
    db_path: &Path,
    query: &str,
    top_k: usize,
    boost: bool,
    format: OutputFormat,
) -> Result<String> {
    let query = non_empty(query, "query")?;
    let config = agent_config(cli, false)?;
    let store = open_vector_store(db_path, &config)?;
    let retriever = Retriever::new(Arc::new(store));
    let docs = runtime()?.block_on(retriever.retrieve(query, top_k, boost))?;
    Ok(format_search_results(&docs, query, boost, format))
}

fn format_search_results(
    docs: &[RetrievedDocument],
    query: &str,
    boost: bool,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => {
            if docs.is_empty() {
                return format!("No results found for query: \"{query}\"\n");
            }
            let mut output = String::new();
            let _ = writeln!(
                output,
                "Search results for \"{query}\" ({} results, boost {}):\n",
                docs.len(),
                if boost { "on" } else { "off" }
            );
            for (i, doc) in docs.iter().enumerate() {
                let _ = writeln!(output, "{}. score {:.4}  {}", i + 1, doc.score, doc.basename());
                let _ = writeln!(output, "   {}", snippet(&doc.content, SNIPPET_LEN));
            }
            output
        }
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "query": query,
            "boost": boost,
            "count": docs.len(),
            "results": docs,
        })),
    }
}

// ==================== Pipeline Commands ====================

fn cmd_run(
    cli: &Cli,
    db_path: &Path,
    topic: &str,
    approval: bool,
    thread_id: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let topic = non_empty(topic, "topic")?;
    let config = agent_config(cli, approval)?;
    let checkpoints: Arc<dyn CheckpointStore> = if approval {
        checkpoint_store(db_path)?
    } else {
        Arc::new(MemoryCheckpointStore::new())
    };
    let pipeline = build_pipeline(db_path, &config, checkpoints)?;

    let outcome = runtime()?
        .block_on(pipeline.run(topic, thread_id))
        .map_err(|e| CommandError::ExecutionFailed(format!("Run failed: {e}")))?;
    Ok(format_outcome(&outcome, format))
}

fn cmd_resume(
    cli: &Cli,
    db_path: &Path,
    thread_id: &str,
    feedback: &str,
    format: OutputFormat,
) -> Result<String> {
    let config = agent_config(cli, true)?;
    let pipeline = build_pipeline(db_path, &config, checkpoint_store(db_path)?)?;
    let outcome = runtime()?
        .block_on(pipeline.resume(thread_id, feedback))
        .map_err(|e| CommandError::ExecutionFailed(format!("Resume failed: {e}")))?;
    Ok(format_outcome(&outcome, format))
}

fn cmd_show(db_path: &Path, thread_id: &str, format: OutputFormat) -> Result<String> {
    let store = SqliteCheckpointStore::open(db_path)?;
    let checkpoint = store
        .load(thread_id)?
        .ok_or_else(|| AgentError::InvalidResumeState {
            thread_id: thread_id.to_string(),
        })?;
    let draft = checkpoint.state.draft.clone().unwrap_or_default();

    match format {
        OutputFormat::Text => {
            let status = if checkpoint.is_completed() {
                "approved"
            } else {
                "awaiting approval"
            };
            Ok(format!(
                "Thread {} ({}, updated {})\n\n{}\n",
                checkpoint.thread_id,
                status,
                checkpoint.updated_at.to_rfc3339(),
                draft
            ))
        }
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "thread_id": checkpoint.thread_id,
            "paused_at": checkpoint.paused_at,
            "completed": checkpoint.is_completed(),
            "created_at": checkpoint.created_at,
            "updated_at": checkpoint.updated_at,
            "topic": checkpoint.state.topic(),
            "draft": draft,
        }))),
    }
}

fn cmd_review(cli: &Cli, db_path: &Path, topic: &str, thread_id: Option<&str>) -> Result<String> {
    let topic = non_empty(topic, "topic")?;
    let config = agent_config(cli, true)?;
    let pipeline = build_pipeline(db_path, &config, checkpoint_store(db_path)?)?;
    let rt = runtime()?;

    let mut outcome = rt
        .block_on(pipeline.run(topic, thread_id))
        .map_err(|e| CommandError::ExecutionFailed(format!("Run failed: {e}")))?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    while let RunOutcome::Suspended { thread_id, draft } = &outcome {
        let thread_id = thread_id.clone();
        writeln!(stdout, "\n{draft}\n")?;
        write!(stdout, "Feedback (type 'approve' to finish): ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(format!(
                "\nReview paused. Resume with: news-nexus resume {thread_id} <feedback>\n"
            ));
        }
        let feedback = line.trim();
        if feedback.is_empty() {
            continue;
        }
        outcome = rt
            .block_on(pipeline.resume(&thread_id, feedback))
            .map_err(|e| CommandError::ExecutionFailed(format!("Resume failed: {e}")))?;
    }
    Ok(format_outcome(&outcome, OutputFormat::Text))
}

fn format_outcome(outcome: &RunOutcome, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => match outcome {
            RunOutcome::Completed { artifact, .. } => format!("{artifact}\n"),
            RunOutcome::Suspended { thread_id, draft } => format!(
                "{draft}\n\n---\nRun {thread_id} is awaiting approval.\n\
                 Resume with: news-nexus resume {thread_id} <feedback>\n"
            ),
        },
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "thread_id": outcome.thread_id(),
            "status": if outcome.is_suspended() { "awaiting_approval" } else { "completed" },
            "text": outcome.text(),
        })),
    }
}

// ==================== Maintenance Commands ====================

fn cmd_delete(db_path: &Path, thread_id: &str, format: OutputFormat) -> Result<String> {
    let store = SqliteCheckpointStore::open(db_path)?;
    if !store.delete(thread_id)? {
        return Err(AgentError::InvalidResumeState {
            thread_id: thread_id.to_string(),
        }
        .into());
    }

    match format {
        OutputFormat::Text => Ok(format!("Deleted checkpoint {thread_id}\n")),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "deleted": thread_id,
        }))),
    }
}

fn cmd_prune(db_path: &Path, older_than_hours: u32, format: OutputFormat) -> Result<String> {
    let store = SqliteCheckpointStore::open(db_path)?;
    let cutoff = Utc::now() - chrono::Duration::hours(i64::from(older_than_hours));
    let removed = store.prune(cutoff)?;

    match format {
        OutputFormat::Text => Ok(format!(
            "Pruned {removed} checkpoint(s) older than {older_than_hours}h\n"
        )),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "removed": removed,
            "cutoff": cutoff,
        }))),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine config directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let _ = writeln!(
                    output,
                    "  {}",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                );
            }
            output.push_str("\nEdit these files to customize the agent prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "directory": target_dir.to_string_lossy(),
            "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
            "count": written.len(),
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::checkpoint::GraphCheckpoint;
    use crate::agent::graph::NodeId;
    use crate::agent::state::PipelineState;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap_or_else(|e| unreachable!("parse failed: {e}"))
    }

    fn doc(content: &str, score: f64) -> RetrievedDocument {
        RetrievedDocument {
            content: content.to_string(),
            source_path: "/pdfs/hr/remote.pdf".to_string(),
            score,
            raw_score: score,
        }
    }

    #[test]
    fn test_format_search_results_text() {
        let out = format_search_results(
            &[doc("Remote work is allowed", 0.1234)],
            "remote",
            true,
            OutputFormat::Text,
        );
        assert!(out.contains("score 0.1234"));
        assert!(out.contains("remote.pdf"));
        assert!(out.contains("Remote work is allowed"));
    }

    #[test]
    fn test_format_search_results_empty() {
        let out = format_search_results(&[], "nothing", false, OutputFormat::Text);
        assert!(out.contains("No results found"));
    }

    #[test]
    fn test_format_outcome_suspended_mentions_resume() {
        let outcome = RunOutcome::Suspended {
            thread_id: "t-9".to_string(),
            draft: "<p>draft</p>".to_string(),
        };
        let out = format_outcome(&outcome, OutputFormat::Text);
        assert!(out.starts_with("<p>draft</p>"));
        assert!(out.contains("news-nexus resume t-9"));
    }

    #[test]
    fn test_show_and_prune_on_disk() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("tempdir: {e}"));
        let db = dir.path().join("nn.db");
        {
            let store =
                SqliteCheckpointStore::open(&db).unwrap_or_else(|e| unreachable!("open: {e}"));
            let mut state = PipelineState::new("AI trends");
            state.draft = Some("<h1>Weekly</h1>".to_string());
            let mut checkpoint = GraphCheckpoint::new("t-1", state, NodeId::HumanApproval);
            checkpoint.updated_at = Utc::now() - chrono::Duration::hours(2);
            let _ = store.save(&checkpoint);
        }

        let shown = cmd_show(&db, "t-1", OutputFormat::Text).unwrap_or_default();
        assert!(shown.contains("awaiting approval"));
        assert!(shown.contains("<h1>Weekly</h1>"));

        let kept = cmd_prune(&db, 3, OutputFormat::Text).unwrap_or_default();
        assert!(kept.contains("Pruned 0"));
        let removed = cmd_prune(&db, 1, OutputFormat::Json).unwrap_or_default();
        assert!(removed.contains("\"removed\": 1"));
    }

    #[test]
    fn test_delete_discards_checkpoint() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("tempdir: {e}"));
        let db = dir.path().join("nn.db");
        {
            let store =
                SqliteCheckpointStore::open(&db).unwrap_or_else(|e| unreachable!("open: {e}"));
            let checkpoint =
                GraphCheckpoint::new("t-2", PipelineState::new("AI"), NodeId::HumanApproval);
            let _ = store.save(&checkpoint);
        }

        let deleted = cmd_delete(&db, "t-2", OutputFormat::Json).unwrap_or_default();
        assert!(deleted.contains("\"deleted\": \"t-2\""));
        assert!(cmd_show(&db, "t-2", OutputFormat::Text).is_err());
        let again = cmd_delete(&db, "t-2", OutputFormat::Text);
        assert!(again.is_err_and(|e| e.to_string().contains("no checkpoint")));
    }

    #[test]
    fn test_show_unknown_thread() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("tempdir: {e}"));
        let result = cmd_show(&dir.path().join("nn.db"), "missing", OutputFormat::Text);
        assert!(result.is_err_and(|e| e.to_string().contains("no checkpoint")));
    }

    #[test]
    fn test_run_rejects_blank_topic() {
        let cli = cli(&["news-nexus", "run", "   "]);
        let result = execute(&cli);
        assert!(result.is_err_and(|e| e.to_string().contains("topic must not be empty")));
    }

    #[test]
    fn test_init_prompts_writes_then_skips() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| unreachable!("tempdir: {e}"));
        let first = cmd_init_prompts(Some(dir.path()), OutputFormat::Text).unwrap_or_default();
        assert!(first.contains("Wrote 3 prompt template(s)"));
        let second = cmd_init_prompts(Some(dir.path()), OutputFormat::Text).unwrap_or_default();
        assert!(second.contains("already exist"));
    }
}
