//! Tool executor that dispatches parsed tool requests to the tool set.
//!
//! Dispatch is an exhaustive match over [`ToolRequest`]. Empty results come
//! back as sentinel text; only upstream failures are errors.

use std::sync::Arc;

use tracing::debug;

use super::finding::ResearchFinding;
use super::tool::{POLICY_DOCS_TOOL, ToolCall, ToolRequest};
use crate::error::AgentError;
use crate::retrieval::Retriever;
use crate::tools::{FeedFetcher, PolicyDocsTool, WebSearchProvider, rss_search, web_search};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Result text for tool names outside the registered set.
pub const UNKNOWN_TOOL: &str = "Unknown tool";

/// Executes tool requests against the retrieval service and external sources.
#[derive(Clone)]
pub struct ToolExecutor {
    policy_docs: PolicyDocsTool,
    web: Arc<dyn WebSearchProvider>,
    feeds: Arc<dyn FeedFetcher>,
    feed_urls: Vec<String>,
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("web", &self.web.name())
            .field("feed_urls", &self.feed_urls)
            .finish_non_exhaustive()
    }
}

impl ToolExecutor {
    /// Creates an executor over the given backends.
    #[must_use]
    pub fn new(
        retriever: Retriever,
        web: Arc<dyn WebSearchProvider>,
        feeds: Arc<dyn FeedFetcher>,
        feed_urls: Vec<String>,
    ) -> Self {
        Self {
            policy_docs: PolicyDocsTool::new(retriever),
            web,
            feeds,
            feed_urls,
        }
    }

    /// Runs one parsed request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] when the document store or the
    /// web search backend fails. RSS failures are isolated per feed and
    /// unknown tools yield [`UNKNOWN_TOOL`].
    pub async fn execute(&self, request: &ToolRequest) -> Result<String, AgentError> {
        debug!(tool = request.tool_name(), query = ?request.query(), "dispatching tool");
        match request {
            ToolRequest::PolicyDocs { query } => {
                self.policy_docs
                    .lookup(query)
                    .await
                    .map_err(|e| AgentError::ToolExecution {
                        name: POLICY_DOCS_TOOL.to_string(),
                        message: e.to_string(),
                    })
            }
            ToolRequest::WebSearch { query } => web_search(self.web.as_ref(), query).await,
            ToolRequest::RssFeed { query } => {
                Ok(rss_search(self.feeds.as_ref(), &self.feed_urls, query).await)
            }
            ToolRequest::Unrecognized { .. } => Ok(UNKNOWN_TOOL.to_string()),
        }
    }

    /// Parses and runs a raw call, attributing the result as a finding.
    ///
    /// Oversized arguments are not dispatched; the finding records why.
    ///
    /// # Errors
    ///
    /// Propagates [`ToolExecutor::execute`] failures.
    pub async fn execute_call(&self, call: &ToolCall) -> Result<ResearchFinding, AgentError> {
        let request = ToolRequest::from_call(call);
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            let note = format!(
                "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                call.arguments.len()
            );
            return Ok(ResearchFinding::new(
                request.source_tool(),
                request.tool_name(),
                &note,
            ));
        }
        let data = self.execute(&request).await?;
        Ok(ResearchFinding::new(
            request.source_tool(),
            request.tool_name(),
            &data,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agent::finding::SourceTool;
    use crate::core::StoredChunk;
    use crate::error::RetrievalError;
    use crate::retrieval::EmbeddingStore;
    use crate::tools::{FeedEntry, NO_RSS_MATCHES, NO_WEB_RESULTS, SearchHit};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Store that records queries and returns nothing.
    #[derive(Default)]
    pub(crate) struct EmptyStore {
        pub(crate) queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingStore for EmptyStore {
        async fn similarity_search(
            &self,
            query: &str,
            _k: usize,
        ) -> Result<Vec<(StoredChunk, f64)>, RetrievalError> {
            if let Ok(mut q) = self.queries.lock() {
                q.push(query.to_string());
            }
            Ok(Vec::new())
        }
    }

    struct DownStore;

    #[async_trait]
    impl EmbeddingStore for DownStore {
        async fn similarity_search(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<(StoredChunk, f64)>, RetrievalError> {
            Err(RetrievalError::Embedding {
                message: "connection refused".to_string(),
            })
        }
    }

    pub(crate) struct NoHits;

    #[async_trait]
    impl WebSearchProvider for NoHits {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchHit>, AgentError> {
            Ok(Vec::new())
        }
    }

    pub(crate) struct NoEntries;

    #[async_trait]
    impl FeedFetcher for NoEntries {
        async fn fetch(&self, _url: &str) -> Result<Vec<FeedEntry>, AgentError> {
            Ok(Vec::new())
        }
    }

    /// Executor whose three tools all return their empty sentinels.
    pub(crate) fn empty_executor(store: Arc<EmptyStore>) -> ToolExecutor {
        ToolExecutor::new(
            Retriever::new(store),
            Arc::new(NoHits),
            Arc::new(NoEntries),
            vec!["https://feed.example/".to_string()],
        )
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_fail() {
        let executor = empty_executor(Arc::default());
        let finding = executor
            .execute_call(&call("send_email", r#"{"query":"x"}"#))
            .await
            .unwrap_or_else(|e| unreachable!("unknown tool failed: {e}"));
        assert_eq!(finding.source_tool, SourceTool::Unrecognized);
        assert_eq!(finding.text, "Source: send_email\nData:\nUnknown tool");
    }

    #[tokio::test]
    async fn test_policy_docs_query_is_sanitized() {
        let store = Arc::new(EmptyStore::default());
        let executor = empty_executor(store.clone());
        let finding = executor
            .execute_call(&call(
                "lookup_policy_docs",
                r#"{"query": "{value: remote work}"}"#,
            ))
            .await
            .unwrap_or_else(|e| unreachable!("lookup failed: {e}"));
        let queries = store.queries.lock().map(|q| q.clone()).unwrap_or_default();
        assert_eq!(queries, vec!["remote work".to_string()]);
        assert!(finding.text.ends_with("for the query: remote work"));
    }

    #[tokio::test]
    async fn test_empty_sentinels() {
        let executor = empty_executor(Arc::default());
        let web = executor
            .execute(&ToolRequest::WebSearch { query: "ai".to_string() })
            .await;
        assert!(web.is_ok_and(|w| w == NO_WEB_RESULTS));
        let rss = executor
            .execute(&ToolRequest::RssFeed { query: "ai".to_string() })
            .await;
        assert!(rss.is_ok_and(|r| r == NO_RSS_MATCHES));
    }

    #[tokio::test]
    async fn test_store_failure_is_tool_error() {
        let executor = ToolExecutor::new(
            Retriever::new(Arc::new(DownStore)),
            Arc::new(NoHits),
            Arc::new(NoEntries),
            Vec::new(),
        );
        let result = executor
            .execute(&ToolRequest::PolicyDocs { query: "remote".to_string() })
            .await;
        assert!(matches!(
            result,
            Err(AgentError::ToolExecution { ref name, .. }) if name == POLICY_DOCS_TOOL
        ));
    }

    #[tokio::test]
    async fn test_oversized_arguments_not_dispatched() {
        let store = Arc::new(EmptyStore::default());
        let executor = empty_executor(store.clone());
        let huge = format!(r#"{{"query":"{}"}}"#, "a".repeat(MAX_TOOL_ARGS_LEN));
        let finding = executor
            .execute_call(&call("lookup_policy_docs", &huge))
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(finding.text.contains("tool arguments too large"));
        assert!(store.queries.lock().map(|q| q.is_empty()).unwrap_or(false));
    }
}
