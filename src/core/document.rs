//! Stored and retrieved document chunks.

use serde::{Deserialize, Serialize};

/// A chunk of source text held by the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Database row ID (`None` until persisted).
    pub id: Option<i64>,
    /// Chunk text.
    pub content: String,
    /// Path of the file the chunk was extracted from.
    pub source: String,
    /// Position of the chunk within its source (0-based).
    pub chunk_index: usize,
}

impl StoredChunk {
    /// Creates an unsaved chunk.
    #[must_use]
    pub fn new(content: impl Into<String>, source: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: None,
            content: content.into(),
            source: source.into(),
            chunk_index,
        }
    }
}

/// A chunk returned by the retrieval service for one query.
///
/// `score` is a distance: lower means a closer match. When keyword boosting
/// is applied, `score` is the adjusted value and `raw_score` keeps what the
/// store reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    /// Chunk text.
    pub content: String,
    /// Source file path as recorded at ingest time.
    pub source_path: String,
    /// Ranking score (distance, lower is better).
    pub score: f64,
    /// Score as returned by the store before re-ranking.
    pub raw_score: f64,
}

impl RetrievedDocument {
    /// Builds a document from a store hit, with `score == raw_score`.
    #[must_use]
    pub fn from_hit(chunk: StoredChunk, raw_score: f64) -> Self {
        Self {
            content: chunk.content,
            source_path: chunk.source,
            score: raw_score,
            raw_score,
        }
    }

    /// Final path component, accepting both `/` and `\` separators.
    #[must_use]
    pub fn basename(&self) -> &str {
        self.source_path
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.source_path)
    }

    /// `file:///` URI for the source path.
    #[must_use]
    pub fn file_uri(&self) -> String {
        let normalized = self.source_path.replace('\\', "/");
        format!("file:///{}", normalized.trim_start_matches('/'))
    }
}
