//! The newsletter agent pipeline.
//!
//! Three LLM-backed nodes run in sequence over a shared [`PipelineState`]:
//!
//! ```text
//! topic → ResearcherAgent (tool calls → findings)
//!       → AnalystAgent    (findings → insights)
//!       → WriterAgent     (insights → HTML draft)
//!       → [human approval, optional] → artifact
//! ```
//!
//! Providers are pluggable behind [`LlmProvider`]; the bundled one speaks the
//! OpenAI-compatible chat API and works against Ollama or OpenAI. Suspended
//! runs are persisted through a [`CheckpointStore`].

pub mod analyst;
pub mod checkpoint;
pub mod client;
pub mod config;
pub mod executor;
pub mod finding;
pub mod graph;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod researcher;
pub mod state;
pub mod tool;
pub mod traits;
pub mod writer;

pub use analyst::AnalystAgent;
pub use checkpoint::{
    CheckpointStore, GraphCheckpoint, MemoryCheckpointStore, SqliteCheckpointStore,
};
pub use client::create_provider;
pub use config::AgentConfig;
pub use executor::ToolExecutor;
pub use finding::{ResearchFinding, SourceTool};
pub use graph::{NodeId, Pipeline, RunOutcome, route_after_human};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use researcher::ResearcherAgent;
pub use state::PipelineState;
pub use tool::{ToolCall, ToolDefinition, ToolRequest, ToolSet};
pub use traits::Agent;
pub use writer::WriterAgent;
