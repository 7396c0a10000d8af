//! The pipeline state machine.
//!
//! ```text
//! topic → Researcher → Analyst → Writer ─┬─────────────────────→ End
//!                                  ▲     └→ [HumanApproval] ─┬→ End
//!                                  └──── feedback ───────────┘
//! ```
//!
//! Each node takes the run's [`PipelineState`] by value and returns the next
//! one; the [`Pipeline`] owns sequencing. With approval enabled the run
//! suspends *before* `HumanApproval`: the state and cursor are written to the
//! [`CheckpointStore`] and control returns to the caller. [`Pipeline::resume`]
//! loads the checkpoint, routes on the feedback and continues the loop.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::analyst::AnalystAgent;
use super::checkpoint::{CheckpointStore, GraphCheckpoint};
use super::config::AgentConfig;
use super::executor::ToolExecutor;
use super::message::{ChatMessage, user_message};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::researcher::ResearcherAgent;
use super::state::PipelineState;
use super::writer::WriterAgent;
use crate::error::AgentError;

/// Substring that ends the feedback loop.
const APPROVE: &str = "approve";

/// A node of the pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    /// Gathers findings with tools.
    Researcher,
    /// Turns findings into insights.
    Analyst,
    /// Writes the HTML newsletter.
    Writer,
    /// Suspension point for human review.
    HumanApproval,
    /// Terminal state.
    End,
}

impl NodeId {
    /// Stable lowercase name, used in checkpoints and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Analyst => "analyst",
            Self::Writer => "writer",
            Self::HumanApproval => "human_approval",
            Self::End => "end",
        }
    }

    /// Parses a name produced by [`NodeId::as_str`].
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        [
            Self::Researcher,
            Self::Analyst,
            Self::Writer,
            Self::HumanApproval,
            Self::End,
        ]
        .into_iter()
        .find(|n| n.as_str() == name)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static edge out of `node`.
///
/// `HumanApproval` has no static edge; see [`route_after_human`].
#[must_use]
pub const fn next_node(node: NodeId, human_approval: bool) -> NodeId {
    match node {
        NodeId::Researcher => NodeId::Analyst,
        NodeId::Analyst => NodeId::Writer,
        NodeId::Writer if human_approval => NodeId::HumanApproval,
        NodeId::Writer | NodeId::HumanApproval | NodeId::End => NodeId::End,
    }
}

/// Conditional edge out of `HumanApproval`.
///
/// Any message containing "approve" (case-insensitive) ends the run;
/// anything else goes back to the writer.
#[must_use]
pub fn route_after_human(latest: &ChatMessage) -> NodeId {
    if latest.content.to_lowercase().contains(APPROVE) {
        NodeId::End
    } else {
        NodeId::Writer
    }
}

/// How a call to [`Pipeline::run`] or [`Pipeline::resume`] ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The graph reached its end.
    Completed {
        /// Run identifier.
        thread_id: String,
        /// Final newsletter: the last writer output.
        artifact: String,
        /// Final state.
        state: PipelineState,
    },
    /// The run is waiting for human feedback.
    Suspended {
        /// Identifier to resume with.
        thread_id: String,
        /// Draft awaiting review.
        draft: String,
    },
}

impl RunOutcome {
    /// Run identifier.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        match self {
            Self::Completed { thread_id, .. } | Self::Suspended { thread_id, .. } => thread_id,
        }
    }

    /// The artifact or the pending draft.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Completed { artifact, .. } => artifact,
            Self::Suspended { draft, .. } => draft,
        }
    }

    /// Whether the run is waiting for feedback.
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }
}

/// Runs the researcher → analyst → writer graph.
pub struct Pipeline {
    provider: Arc<dyn LlmProvider>,
    executor: ToolExecutor,
    checkpoints: Arc<dyn CheckpointStore>,
    researcher: ResearcherAgent,
    analyst: AnalystAgent,
    writer: WriterAgent,
    human_approval: bool,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("provider", &self.provider.name())
            .field("executor", &self.executor)
            .field("human_approval", &self.human_approval)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Assembles a pipeline.
    #[must_use]
    pub fn new(
        config: &AgentConfig,
        prompts: &PromptSet,
        provider: Arc<dyn LlmProvider>,
        executor: ToolExecutor,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            provider,
            executor,
            checkpoints,
            researcher: ResearcherAgent::new(
                &config.researcher_model,
                &prompts.researcher,
                config.temperature,
                config.max_tokens,
            ),
            analyst: AnalystAgent::new(
                &config.analyst_model,
                &prompts.analyst,
                config.temperature,
                config.max_tokens,
            ),
            writer: WriterAgent::new(
                &config.writer_model,
                &prompts.writer,
                config.temperature,
                config.max_tokens,
            ),
            human_approval: config.human_approval,
        }
    }

    /// Starts a run for `topic`.
    ///
    /// A fresh thread id is generated when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::StageFailed`] naming the failed node, or a
    /// checkpoint error if the suspended state cannot be saved.
    pub async fn run(&self, topic: &str, thread_id: Option<&str>) -> Result<RunOutcome, AgentError> {
        let thread_id = thread_id.map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);
        info!(%thread_id, topic, approval = self.human_approval, "starting run");
        self.drive(
            thread_id,
            PipelineState::new(topic),
            NodeId::Researcher,
            self.human_approval,
        )
        .await
    }

    /// Resumes a suspended run with human feedback.
    ///
    /// Approval marks the checkpoint completed and returns the draft as the
    /// final artifact; approving an already completed run returns the same
    /// artifact again. Other feedback is appended to the conversation and
    /// the run re-enters the writer.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidResumeState`] if no checkpoint exists,
    /// [`AgentError::RunAlreadyCompleted`] for feedback on an approved run,
    /// and stage or checkpoint failures from the continued run.
    pub async fn resume(&self, thread_id: &str, feedback: &str) -> Result<RunOutcome, AgentError> {
        let Some(mut checkpoint) = self.checkpoints.load(thread_id)? else {
            return Err(AgentError::InvalidResumeState {
                thread_id: thread_id.to_string(),
            });
        };

        let feedback = user_message(feedback);
        let route = route_after_human(&feedback);

        if checkpoint.is_completed() {
            if route != NodeId::End {
                return Err(AgentError::RunAlreadyCompleted {
                    thread_id: thread_id.to_string(),
                });
            }
            return Ok(completed(thread_id.to_string(), checkpoint.state));
        }

        if route == NodeId::End {
            checkpoint.paused_at = NodeId::End;
            checkpoint.updated_at = Utc::now();
            self.checkpoints.save(&checkpoint)?;
            info!(thread_id, "run approved");
            return Ok(completed(thread_id.to_string(), checkpoint.state));
        }

        info!(thread_id, next = %route, "feedback received");
        let mut state = checkpoint.state;
        state.push(feedback);
        self.drive(thread_id.to_string(), state, route, true).await
    }

    /// Loads the checkpoint for `thread_id`.
    ///
    /// # Errors
    ///
    /// Returns a checkpoint error if the store cannot be read.
    pub fn checkpoint(&self, thread_id: &str) -> Result<Option<GraphCheckpoint>, AgentError> {
        Ok(self.checkpoints.load(thread_id)?)
    }

    async fn drive(
        &self,
        thread_id: String,
        mut state: PipelineState,
        mut cursor: NodeId,
        human_approval: bool,
    ) -> Result<RunOutcome, AgentError> {
        loop {
            match cursor {
                NodeId::End => {
                    info!(%thread_id, messages = state.messages.len(), "run complete");
                    return Ok(completed(thread_id, state));
                }
                NodeId::HumanApproval => {
                    let draft = state.draft.clone().unwrap_or_default();
                    let checkpoint =
                        GraphCheckpoint::new(thread_id.clone(), state, NodeId::HumanApproval);
                    self.checkpoints.save(&checkpoint)?;
                    info!(%thread_id, "suspended for approval");
                    return Ok(RunOutcome::Suspended { thread_id, draft });
                }
                node => {
                    info!(%thread_id, %node, "entering node");
                    state = self.step(node, state).await?;
                    cursor = next_node(node, human_approval);
                }
            }
        }
    }

    async fn step(&self, node: NodeId, state: PipelineState) -> Result<PipelineState, AgentError> {
        let query = match node {
            NodeId::Researcher => state.last_message().map(|m| m.content.clone()),
            _ => None,
        }
        .unwrap_or_else(|| state.topic().to_string());

        let provider = self.provider.as_ref();
        let result = match node {
            NodeId::Researcher => self.researcher.run(provider, &self.executor, state).await,
            NodeId::Analyst => self.analyst.run(provider, state).await,
            NodeId::Writer => self.writer.run(provider, state).await,
            NodeId::HumanApproval | NodeId::End => Ok(state),
        };

        result.map_err(|e| {
            warn!(%node, %query, error = %e, "stage failed");
            AgentError::StageFailed {
                stage: node.to_string(),
                query,
                message: e.to_string(),
            }
        })
    }
}

fn completed(thread_id: String, state: PipelineState) -> RunOutcome {
    RunOutcome::Completed {
        thread_id,
        artifact: state.draft.clone().unwrap_or_default(),
        state,
    }
}
