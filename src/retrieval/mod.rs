//! Retrieval service over the embedding store.
//!
//! [`Retriever::retrieve`] asks the store for `k + 2` candidates, optionally
//! re-ranks them by keyword overlap with the query, and returns at most `k`
//! documents. Scores are distances: lower is better, so a keyword match
//! *reduces* the score by [`BOOST_PER_MATCH`].

pub mod embedding;
pub mod store;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

pub use embedding::{Embedder, OllamaEmbedder};
pub use store::{EmbeddingStore, SqliteVectorStore};

use crate::core::{RetrievedDocument, StoredChunk, query_terms};
use crate::error::RetrievalError;

/// Score reduction per query term found in a candidate.
pub const BOOST_PER_MATCH: f64 = 0.05;
/// Extra candidates fetched beyond `k` so re-ranking has room to promote.
pub const CANDIDATE_HEADROOM: usize = 2;

/// Retrieval service wrapping an [`EmbeddingStore`].
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn EmbeddingStore>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever").finish_non_exhaustive()
    }
}

impl Retriever {
    /// Creates a retriever over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EmbeddingStore>) -> Self {
        Self { store }
    }

    /// Returns at most `k` documents for `query`.
    ///
    /// An empty store yields an empty vector.
    ///
    /// # Errors
    ///
    /// Propagates store and embedding failures without retrying.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        apply_keyword_boost: bool,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let candidates = self
            .store
            .similarity_search(query, k.saturating_add(CANDIDATE_HEADROOM))
            .await?;
        let candidate_count = candidates.len();
        let docs = rank_candidates(query, candidates, k, apply_keyword_boost);
        debug!(
            k,
            boost = apply_keyword_boost,
            candidates = candidate_count,
            results = docs.len(),
            "retrieved documents"
        );
        Ok(docs)
    }
}

/// Number of distinct `terms` that occur as substrings of `content`.
#[must_use]
pub fn keyword_matches(terms: &HashSet<String>, content: &str) -> usize {
    let lowered = content.to_lowercase();
    terms.iter().filter(|t| lowered.contains(t.as_str())).count()
}

/// Orders store candidates and truncates to `k`.
///
/// Without boosting the store order is kept. With boosting each score
/// becomes `raw - BOOST_PER_MATCH * matches` and the list is stably
/// re-sorted ascending.
#[must_use]
pub fn rank_candidates(
    query: &str,
    candidates: Vec<(StoredChunk, f64)>,
    k: usize,
    apply_keyword_boost: bool,
) -> Vec<RetrievedDocument> {
    let mut docs: Vec<RetrievedDocument> = candidates
        .into_iter()
        .map(|(chunk, score)| RetrievedDocument::from_hit(chunk, score))
        .collect();

    if apply_keyword_boost {
        let terms = query_terms(query);
        for doc in &mut docs {
            #[allow(clippy::cast_precision_loss)]
            let matches = keyword_matches(&terms, &doc.content) as f64;
            doc.score = BOOST_PER_MATCH.mul_add(-matches, doc.raw_score);
        }
        docs.sort_by(|a, b| a.score.total_cmp(&b.score));
    }

    docs.truncate(k);
    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    /// Store returning a fixed candidate list and recording requested `k`.
    struct FixedStore {
        hits: Vec<(StoredChunk, f64)>,
        requested: Mutex<Vec<usize>>,
    }

    impl FixedStore {
        fn new(hits: Vec<(StoredChunk, f64)>) -> Self {
            Self {
                hits,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EmbeddingStore for FixedStore {
        async fn similarity_search(
            &self,
            _query: &str,
            k: usize,
        ) -> Result<Vec<(StoredChunk, f64)>, RetrievalError> {
            if let Ok(mut r) = self.requested.lock() {
                r.push(k);
            }
            Ok(self.hits.iter().take(k).cloned().collect())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl EmbeddingStore for FailingStore {
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

    fn hit(content: &str, score: f64) -> (StoredChunk, f64) {
        (StoredChunk::new(content, format!("/pdfs/{content}.pdf"), 0), score)
    }

    fn genai_hits() -> Vec<(StoredChunk, f64)> {
        vec![
            hit("office layout guidelines", 0.30),
            hit("travel expense rules", 0.32),
            hit("meeting room booking", 0.34),
            hit("genai productivity study results", 0.36),
            hit("parking permits", 0.40),
        ]
    }

    #[tokio::test]
    async fn test_requests_headroom() {
        let store = Arc::new(FixedStore::new(genai_hits()));
        let retriever = Retriever::new(store.clone());
        let _ = retriever.retrieve("anything", 3, false).await;
        let requested = store.requested.lock().map(|r| r.clone()).unwrap_or_default();
        assert_eq!(requested, vec![5]);
    }

    #[tokio::test]
    async fn test_huge_k_saturates() {
        let store = Arc::new(FixedStore::new(genai_hits()));
        let retriever = Retriever::new(store.clone());
        let docs = retriever.retrieve("genai", usize::MAX, true).await;
        assert!(docs.is_ok_and(|d| d.len() == 5));
        let requested = store.requested.lock().map(|r| r.clone()).unwrap_or_default();
        assert_eq!(requested, vec![usize::MAX]);
    }

    #[tokio::test]
    async fn test_unboosted_keeps_store_order() {
        let retriever = Retriever::new(Arc::new(FixedStore::new(genai_hits())));
        let docs = retriever
            .retrieve("GenAI productivity", 3, false)
            .await
            .unwrap_or_default();
        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "office layout guidelines",
                "travel expense rules",
                "meeting room booking"
            ]
        );
    }

    #[tokio::test]
    async fn test_boost_promotes_matching_chunk() {
        let retriever = Retriever::new(Arc::new(FixedStore::new(genai_hits())));
        let docs = retriever
            .retrieve("GenAI productivity", 3, true)
            .await
            .unwrap_or_default();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].content, "genai productivity study results");
        assert!((docs[0].raw_score - docs[0].score - 0.10).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fewer_documents_than_k() {
        let retriever = Retriever::new(Arc::new(FixedStore::new(vec![hit("only one", 0.2)])));
        let docs = retriever.retrieve("one", 4, true).await.unwrap_or_default();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty() {
        let retriever = Retriever::new(Arc::new(FixedStore::new(Vec::new())));
        let docs = retriever.retrieve("anything", 3, true).await;
        assert!(docs.is_ok_and(|d| d.is_empty()));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let retriever = Retriever::new(Arc::new(FailingStore));
        let result = retriever.retrieve("anything", 3, true).await;
        assert!(matches!(result, Err(RetrievalError::Embedding { .. })));
    }

    #[test]
    fn test_keyword_matches_counts_distinct_terms() {
        let terms = query_terms("remote work remote");
        assert_eq!(keyword_matches(&terms, "Remote WORK policy, remote first"), 2);
        assert_eq!(keyword_matches(&terms, "office only"), 0);
    }

    fn arb_candidates() -> impl Strategy<Value = Vec<(StoredChunk, f64)>> {
        let words = prop::sample::select(vec!["genai", "policy", "remote", "work", "model", "q3"]);
        prop::collection::vec(
            (prop::collection::vec(words, 0..6), 0.0_f64..2.0),
            0..10,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (ws, score))| {
                    (StoredChunk::new(ws.join(" "), format!("/doc{i}.pdf"), i), score)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_unboosted_is_prefix_of_store_result(
            candidates in arb_candidates(),
            k in 0usize..8,
        ) {
            let docs = rank_candidates("remote work", candidates.clone(), k, false);
            prop_assert!(docs.len() <= k);
            for (doc, (chunk, score)) in docs.iter().zip(&candidates) {
                prop_assert_eq!(&doc.content, &chunk.content);
                prop_assert!((doc.score - score).abs() < 1e-12);
            }
        }

        #[test]
        fn prop_boosted_sorted_and_adjusted(
            candidates in arb_candidates(),
            k in 0usize..8,
        ) {
            let query = "GenAI remote model";
            let terms = query_terms(query);
            let docs = rank_candidates(query, candidates, k, true);
            prop_assert!(docs.len() <= k);
            for pair in docs.windows(2) {
                prop_assert!(pair[0].score <= pair[1].score);
            }
            for doc in &docs {
                #[allow(clippy::cast_precision_loss)]
                let matches = keyword_matches(&terms, &doc.content) as f64;
                prop_assert!((doc.score - (doc.raw_score - 0.05 * matches)).abs() < 1e-9);
            }
        }
    }
}
