//! Research findings produced by the researcher node.

use serde::{Deserialize, Serialize};

/// Tool that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTool {
    /// Internal document lookup.
    PolicyDocs,
    /// General web search.
    WebSearch,
    /// RSS feed search.
    RssFeed,
    /// A tool the model asked for that does not exist.
    Unrecognized,
}

/// One tool result, attributed to its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchFinding {
    /// Source category.
    pub source_tool: SourceTool,
    /// Attributed text: `Source: <tool>\nData:\n<result>`.
    pub text: String,
}

impl ResearchFinding {
    /// Creates a finding with the standard attribution header.
    #[must_use]
    pub fn new(source_tool: SourceTool, tool_name: &str, data: &str) -> Self {
        Self {
            source_tool,
            text: format!("Source: {tool_name}\nData:\n{data}"),
        }
    }
}

/// Joins finding texts in order with a blank line between them.
#[must_use]
pub fn join_findings(findings: &[ResearchFinding]) -> String {
    findings
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
