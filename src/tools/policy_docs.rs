//! Internal policy document lookup over the retrieval service.

use std::fmt::Write;

use crate::core::RetrievedDocument;
use crate::error::RetrievalError;
use crate::retrieval::Retriever;

/// Documents returned per lookup.
pub const POLICY_DOCS_K: usize = 3;

/// Removes structuring debris that models leak into tool arguments.
///
/// Braces are dropped and a leading `value:` marker is stripped, so
/// `{value: remote work}` becomes `remote work`.
#[must_use]
pub fn sanitize_query(raw: &str) -> String {
    let unbraced: String = raw.chars().filter(|c| !matches!(c, '{' | '}')).collect();
    let trimmed = unbraced.trim();
    trimmed
        .strip_prefix("value:")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Formats one retrieved document with its source link.
fn format_document(doc: &RetrievedDocument) -> String {
    let name = doc.basename();
    let mut out = format!("Content: {}\nSource: {name}\n", doc.content);
    if doc.score.is_finite() {
        let _ = writeln!(out, "Score: {:.4}", doc.score);
    } else {
        out.push_str("Score: not available\n");
    }
    let _ = write!(out, "SourceLink: [{name}]({})", doc.file_uri());
    out
}

/// Looks up internal documents for the researcher.
#[derive(Debug, Clone)]
pub struct PolicyDocsTool {
    retriever: Retriever,
}

impl PolicyDocsTool {
    /// Creates the tool over `retriever`.
    #[must_use]
    pub const fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }

    /// Runs a boosted lookup and formats the hits.
    ///
    /// # Errors
    ///
    /// Propagates [`RetrievalError`] when the store is unreachable.
    pub async fn lookup(&self, raw_query: &str) -> Result<String, RetrievalError> {
        let query = sanitize_query(raw_query);
        let docs = self.retriever.retrieve(&query, POLICY_DOCS_K, true).await?;

        if docs.is_empty() {
            return Ok(format!(
                "No documents found internally relevant for the query: {query}"
            ));
        }

        Ok(docs
            .iter()
            .map(format_document)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StoredChunk;
    use crate::retrieval::EmbeddingStore;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use test_case::test_case;

    struct RecordingStore {
        queries: Mutex<Vec<String>>,
        hits: Vec<(StoredChunk, f64)>,
    }

    #[async_trait]
    impl EmbeddingStore for RecordingStore {
        async fn similarity_search(
            &self,
            query: &str,
            k: usize,
        ) -> Result<Vec<(StoredChunk, f64)>, RetrievalError> {
            if let Ok(mut q) = self.queries.lock() {
                q.push(query.to_string());
            }
            Ok(self.hits.iter().take(k).cloned().collect())
        }
    }

    fn tool(hits: Vec<(StoredChunk, f64)>) -> (PolicyDocsTool, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore {
            queries: Mutex::new(Vec::new()),
            hits,
        });
        (PolicyDocsTool::new(Retriever::new(store.clone())), store)
    }

    #[test_case("{value: remote work}", "remote work" ; "braced value marker")]
    #[test_case("{remote work}", "remote work" ; "braces only")]
    #[test_case("remote work", "remote work" ; "clean query")]
    #[test_case("  value:hybrid policy ", "hybrid policy" ; "bare value marker")]
    #[test_case("{}", "" ; "empty braces")]
    fn test_sanitize_query(raw: &str, expected: &str) {
        assert_eq!(sanitize_query(raw), expected);
    }

    #[tokio::test]
    async fn test_lookup_sanitizes_before_retrieval() {
        let (tool, store) = tool(Vec::new());
        let _ = tool.lookup("{value: remote work}").await;
        let queries = store.queries.lock().map(|q| q.clone()).unwrap_or_default();
        assert_eq!(queries, vec!["remote work".to_string()]);
    }

    #[tokio::test]
    async fn test_lookup_no_results_sentinel() {
        let (tool, _) = tool(Vec::new());
        let out = tool.lookup("hybrid work").await.unwrap_or_default();
        assert_eq!(
            out,
            "No documents found internally relevant for the query: hybrid work"
        );
    }

    #[tokio::test]
    async fn test_lookup_formats_sources() {
        let (tool, _) = tool(vec![
            (
                StoredChunk::new("Remote work is allowed two days a week.", "/pdfs/hr/remote.pdf", 0),
                0.25,
            ),
            (StoredChunk::new("Unrelated.", "/pdfs/misc.pdf", 0), f64::NAN),
        ]);
        let out = tool.lookup("remote work").await.unwrap_or_default();
        assert!(out.contains("Content: Remote work is allowed two days a week."));
        assert!(out.contains("Source: remote.pdf"));
        assert!(out.contains("SourceLink: [remote.pdf](file:///pdfs/hr/remote.pdf)"));
        assert!(out.contains("Score: 0.1500"));
        assert!(out.contains("Score: not available"));
        assert_eq!(out.matches("Content: ").count(), 2);
    }
}
