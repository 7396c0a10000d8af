//! Writer node: formats the latest insights as an HTML newsletter.

use async_trait::async_trait;
use tracing::info;

use super::message::user_message;
use super::prompt::build_writer_prompt;
use super::provider::LlmProvider;
use super::state::PipelineState;
use super::traits::Agent;
use crate::error::AgentError;

/// Compiles insights into the newsletter draft.
#[derive(Debug, Clone)]
pub struct WriterAgent {
    model: String,
    template: String,
    temperature: f32,
    max_tokens: u32,
}

impl WriterAgent {
    /// Creates a writer using `template` (see [`build_writer_prompt`]).
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

    /// Writes (or revises) the draft from the most recent message.
    ///
    /// # Errors
    ///
    /// Propagates provider failures.
    pub async fn run(
        &self,
        provider: &dyn LlmProvider,
        mut state: PipelineState,
    ) -> Result<PipelineState, AgentError> {
        let insights = state.last_message().map_or("", |m| m.content.as_str());
        let prompt = build_writer_prompt(&self.template, insights, state.draft.as_deref());
        let revision = state.draft.is_some();

        let response = self.invoke(provider, vec![user_message(&prompt)]).await?;
        info!(revision, chars = response.content.len(), "draft written");

        state.draft = Some(response.content.clone());
        state.push(response.into_message());
        Ok(state)
    }
}

#[async_trait]
impl Agent for WriterAgent {
    fn name(&self) -> &'static str {
        "writer"
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
