//! State threaded through one pipeline run.

use serde::{Deserialize, Serialize};

use super::finding::ResearchFinding;
use super::message::{ChatMessage, user_message};

/// Conversation plus the per-run buffers.
///
/// Messages are append-only; the last message is always the latest node
/// output or injected human feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Ordered conversation.
    pub messages: Vec<ChatMessage>,
    /// Findings from the most recent researcher pass.
    pub findings: Vec<ResearchFinding>,
    /// Auxiliary chart data; cleared by the analyst.
    #[serde(default)]
    pub chart_data: Vec<serde_json::Value>,
    /// Latest writer output.
    #[serde(default)]
    pub draft: Option<String>,
}

impl PipelineState {
    /// Seeds a run with a single topic message.
    #[must_use]
    pub fn new(topic: &str) -> Self {
        Self {
            messages: vec![user_message(topic)],
            ..Self::default()
        }
    }

    /// The most recent message.
    #[must_use]
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// The topic the run was seeded with.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.messages.first().map_or("", |m| m.content.as_str())
    }

    /// Appends a message.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::finding::SourceTool;
    use crate::agent::message::{Role, assistant_message};

    #[test]
    fn test_new_seeds_topic() {
        let state = PipelineState::new("AI trends 2026");
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.topic(), "AI trends 2026");
        assert_eq!(state.last_message().map(|m| m.role), Some(Role::User));
        assert!(state.findings.is_empty());
        assert!(state.chart_data.is_empty());
        assert!(state.draft.is_none());
    }

    #[test]
    fn test_json_roundtrip_preserves_messages_and_findings() {
        let mut state = PipelineState::new("topic");
        state.push(assistant_message("insights"));
        state.findings.push(ResearchFinding::new(
            SourceTool::PolicyDocs,
            "lookup_policy_docs",
            "No documents found",
        ));
        state.draft = Some("<h1>x</h1>".to_string());

        let json = serde_json::to_string(&state).unwrap_or_default();
        let back: PipelineState = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(back, state);
    }
}
