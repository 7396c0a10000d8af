//! Analyst node: turns research findings into insights.

use async_trait::async_trait;
use tracing::info;

use super::finding::join_findings;
use super::message::user_message;
use super::prompt::build_analyst_prompt;
use super::provider::LlmProvider;
use super::state::PipelineState;
use super::traits::Agent;
use crate::error::AgentError;

/// Extracts trends and numeric insights from the findings.
#[derive(Debug, Clone)]
pub struct AnalystAgent {
    model: String,
    template: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnalystAgent {
    /// Creates an analyst using `template` (see [`build_analyst_prompt`]).
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        template: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            template: template.into(),
            temperature,
            max_tokens,
        }
    }

    /// Runs one analysis pass with no tools and clears the chart buffer.
    ///
    /// # Errors
    ///
    /// Propagates provider failures.
    pub async fn run(
        &self,
        provider: &dyn LlmProvider,
        mut state: PipelineState,
    ) -> Result<PipelineState, AgentError> {
        let prompt = build_analyst_prompt(&self.template, &join_findings(&state.findings));
        let response = self.invoke(provider, vec![user_message(&prompt)]).await?;
        info!(findings = state.findings.len(), "analysis complete");

        state.push(response.into_message());
        state.chart_data.clear();
        Ok(state)
    }
}

#[async_trait]
impl Agent for AnalystAgent {
    fn name(&self) -> &'static str {
        "analyst"
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
}
