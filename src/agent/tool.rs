//! Tool definitions and typed tool requests.
//!
//! The researcher is bound to three tools. Raw [`ToolCall`]s returned by the
//! model are parsed into a closed [`ToolRequest`] enum before dispatch, so
//! the executor matches exhaustively instead of comparing strings.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::finding::SourceTool;

/// Name of the internal document lookup tool.
pub const POLICY_DOCS_TOOL: &str = "lookup_policy_docs";
/// Name of the web search tool.
pub const WEB_SEARCH_TOOL: &str = "web_search";
/// Name of the RSS search tool.
pub const RSS_FEED_TOOL: &str = "rss_feed_search";

/// Older name for the web search tool still emitted by some prompts.
const WEB_SEARCH_ALIAS: &str = "web_search_stub";

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match [`ToolRequest::from_call`]).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// A parsed tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    /// Internal document lookup.
    PolicyDocs {
        /// Free-text query, possibly still carrying argument debris.
        query: String,
    },
    /// General web search.
    WebSearch {
        /// Search query.
        query: String,
    },
    /// RSS feed keyword search.
    RssFeed {
        /// Search query.
        query: String,
    },
    /// A tool name outside the registered set.
    Unrecognized {
        /// Name the model asked for.
        name: String,
    },
}

impl ToolRequest {
    /// Parses a raw call.
    ///
    /// The `query` argument is coerced to a string: non-string JSON values
    /// are rendered as JSON, a missing argument becomes `""`, and arguments
    /// that are not JSON at all are used verbatim.
    #[must_use]
    pub fn from_call(call: &ToolCall) -> Self {
        let query = || extract_query(&call.arguments);
        match call.name.as_str() {
            POLICY_DOCS_TOOL => Self::PolicyDocs { query: query() },
            WEB_SEARCH_TOOL | WEB_SEARCH_ALIAS => Self::WebSearch { query: query() },
            RSS_FEED_TOOL => Self::RssFeed { query: query() },
            other => Self::Unrecognized {
                name: other.to_string(),
            },
        }
    }

    /// Tool name used in finding attribution.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::PolicyDocs { .. } => POLICY_DOCS_TOOL,
            Self::WebSearch { .. } => WEB_SEARCH_TOOL,
            Self::RssFeed { .. } => RSS_FEED_TOOL,
            Self::Unrecognized { name } => name,
        }
    }

    /// Source category of the finding this request produces.
    #[must_use]
    pub const fn source_tool(&self) -> SourceTool {
        match self {
            Self::PolicyDocs { .. } => SourceTool::PolicyDocs,
            Self::WebSearch { .. } => SourceTool::WebSearch,
            Self::RssFeed { .. } => SourceTool::RssFeed,
            Self::Unrecognized { .. } => SourceTool::Unrecognized,
        }
    }

    /// Query text, if the tool takes one.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::PolicyDocs { query } | Self::WebSearch { query } | Self::RssFeed { query } => {
                Some(query)
            }
            Self::Unrecognized { .. } => None,
        }
    }
}

fn extract_query(arguments: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(arguments) {
        Ok(value) => match value.get("query") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
        Err(_) => arguments.to_string(),
    }
}

/// A set of tool definitions bound to an agent.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Tools bound to the researcher.
    #[must_use]
    pub fn research_tools() -> Self {
        Self {
            definitions: vec![
                query_tool(
                    POLICY_DOCS_TOOL,
                    "Search internal company documents (policies, productivity reports, \
                     guidelines) ingested from PDFs.",
                ),
                query_tool(
                    WEB_SEARCH_TOOL,
                    "Search the public web for recent news and articles. Returns the top 5 \
                     results with title, link and snippet.",
                ),
                query_tool(
                    RSS_FEED_TOOL,
                    "Search recent entries of technology news feeds for matching keywords.",
                ),
            ],
        }
    }

    /// Empty tool set (no tools available).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

fn query_tool(name: &str, description: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text search query."
                }
            },
            "required": ["query"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_research_tools() {
        let ts = ToolSet::research_tools();
        assert_eq!(ts.len(), 3);
        let names: Vec<&str> = ts.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec![POLICY_DOCS_TOOL, WEB_SEARCH_TOOL, RSS_FEED_TOOL]);
        for def in ts.definitions() {
            assert_eq!(def.parameters["type"], "object");
            assert_eq!(def.parameters["required"][0], "query");
        }
    }

    #[test]
    fn test_toolset_none() {
        let ts = ToolSet::none();
        assert!(ts.is_empty());
        assert_eq!(ts.len(), 0);
    }

    #[test_case(r#"{"query": "remote work"}"#, "remote work" ; "string query")]
    #[test_case(r#"{"query": "{value: remote work}"}"#, "{value: remote work}" ; "debris kept for sanitizer")]
    #[test_case(r#"{"query": 2026}"#, "2026" ; "number coerced")]
    #[test_case(r#"{"query": {"value": "ai"}}"#, r#"{"value":"ai"}"# ; "object coerced")]
    #[test_case(r#"{"q": "ai"}"#, "" ; "missing query")]
    #[test_case(r#"{"query": null}"#, "" ; "null query")]
    #[test_case("ai trends", "ai trends" ; "not json")]
    fn test_query_extraction(arguments: &str, expected: &str) {
        let request = ToolRequest::from_call(&call(WEB_SEARCH_TOOL, arguments));
        assert_eq!(request.query(), Some(expected));
    }

    #[test]
    fn test_from_call_maps_names() {
        let args = r#"{"query":"x"}"#;
        assert!(matches!(
            ToolRequest::from_call(&call(POLICY_DOCS_TOOL, args)),
            ToolRequest::PolicyDocs { .. }
        ));
        assert!(matches!(
            ToolRequest::from_call(&call("web_search_stub", args)),
            ToolRequest::WebSearch { .. }
        ));
        assert!(matches!(
            ToolRequest::from_call(&call(RSS_FEED_TOOL, args)),
            ToolRequest::RssFeed { .. }
        ));
        let unknown = ToolRequest::from_call(&call("send_email", args));
        assert_eq!(unknown.tool_name(), "send_email");
        assert_eq!(unknown.source_tool(), SourceTool::Unrecognized);
        assert!(unknown.query().is_none());
    }

    #[test]
    fn test_tool_call_serialization() {
        let c = call(POLICY_DOCS_TOOL, r#"{"query":"remote"}"#);
        let json = serde_json::to_string(&c).unwrap_or_default();
        assert!(json.contains("call_1"));
        assert!(json.contains(POLICY_DOCS_TOOL));
    }
}
