//! Agent trait definition.
//!
//! The researcher, analyst and writer implement this trait, which gives the
//! graph runner a uniform way to build requests against a provider.

use async_trait::async_trait;

use super::message::{ChatMessage, ChatRequest, ChatResponse};
use super::provider::LlmProvider;
use super::tool::ToolDefinition;
use crate::error::AgentError;

/// Trait implemented by every pipeline node agent.
///
/// Agents encapsulate a role with a fixed model configuration. Nodes that
/// need tools override [`Agent::tools`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and error context.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        4096
    }

    /// Tool definitions bound to this agent.
    ///
    /// Returns an empty vec by default (no tools).
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Sends `messages` to the provider in one completion call.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn invoke(
        &self,
        provider: &dyn LlmProvider,
        messages: Vec<ChatMessage>,
    ) -> Result<ChatResponse, AgentError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            tools: self.tools(),
        };
        provider.chat(&request).await
    }
}
