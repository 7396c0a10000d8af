//! Researcher node: asks the model which tools to call and gathers findings.

use async_trait::async_trait;
use tracing::{debug, info};

use super::executor::ToolExecutor;
use super::message::{system_message, user_message};
use super::provider::LlmProvider;
use super::state::PipelineState;
use super::tool::{ToolDefinition, ToolSet};
use super::traits::Agent;
use crate::error::AgentError;

/// Gathers data by letting the model call the research tools.
#[derive(Debug, Clone)]
pub struct ResearcherAgent {
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

impl ResearcherAgent {
    /// Creates a researcher.
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            temperature,
            max_tokens,
        }
    }

    /// Runs one research pass.
    ///
    /// Sends the system instruction and the latest message in a single call,
    /// dispatches every requested tool in order, replaces the findings and
    /// appends the raw model response.
    ///
    /// # Errors
    ///
    /// Propagates provider failures and tool upstream failures.
    pub async fn run(
        &self,
        provider: &dyn LlmProvider,
        executor: &ToolExecutor,
        mut state: PipelineState,
    ) -> Result<PipelineState, AgentError> {
        let last = state
            .last_message()
            .cloned()
            .unwrap_or_else(|| user_message(""));
        let response = self
            .invoke(provider, vec![system_message(&self.system_prompt), last])
            .await?;
        debug!(tool_calls = response.tool_calls.len(), "researcher response");

        let mut findings = Vec::with_capacity(response.tool_calls.len());
        for call in &response.tool_calls {
            findings.push(executor.execute_call(call).await?);
        }
        info!(findings = findings.len(), "research gathered");

        state.findings = findings;
        state.push(response.into_message());
        Ok(state)
    }
}

#[async_trait]
impl Agent for ResearcherAgent {
    fn name(&self) -> &'static str {
        "researcher"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        ToolSet::research_tools().definitions().to_vec()
    }
}
