//! Nearest-neighbour chunk store.
//!
//! [`EmbeddingStore`] is the only contract the retrieval service relies on:
//! given a query, return up to `k` stored chunks ordered by distance.
//! [`SqliteVectorStore`] is the bundled implementation: chunks and their
//! embeddings live in one SQLite table and search is an exact cosine-distance
//! scan.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, params};
use tracing::debug;

use super::embedding::Embedder;
use crate::core::StoredChunk;
use crate::error::{RetrievalError, StorageError};

/// A nearest-neighbour search service over stored text chunks.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Returns up to `k` chunks closest to `query`, ascending by distance.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the query cannot be embedded or the
    /// store cannot be read.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(StoredChunk, f64)>, RetrievalError>;
}

/// SQLite-backed vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("embedder", &self.embedder.model_name())
            .finish_non_exhaustive()
    }
}

impl SqliteVectorStore {
    /// Opens (creating if needed) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the directory or schema cannot be created.
    pub fn open(path: &Path, embedder: Arc<dyn Embedder>) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Open {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn, embedder)
    }

    /// Opens a transient in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the schema cannot be created.
    pub fn in_memory(embedder: Arc<dyn Embedder>) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?, embedder)
    }

    fn with_connection(conn: Connection, embedder: Arc<dyn Embedder>) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                embedding BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Replaces every chunk stored for `source` with `chunks`.
    ///
    /// Chunks are embedded `batch_size` at a time before the database is
    /// touched. The old rows are then deleted and the new ones inserted in a
    /// single transaction, so an embedding or write failure leaves the
    /// previous chunks of `source` in place.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] on embedding or database failure.
    pub async fn replace_source(
        &self,
        source: &str,
        chunks: &[StoredChunk],
        batch_size: usize,
    ) -> Result<usize, RetrievalError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for (i, batch) in chunks.chunks(batch_size.max(1)).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = self.embedder.embed(&texts).await?;
            if embedded.len() != batch.len() {
                return Err(RetrievalError::InvalidResponse {
                    message: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        embedded.len()
                    ),
                });
            }
            debug!(source, batch = i + 1, size = batch.len(), "embedded batch");
            vectors.extend(embedded);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StorageError::from)?;
        let removed = tx
            .execute("DELETE FROM chunks WHERE source = ?1", params![source])
            .map_err(StorageError::from)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO chunks (content, source, chunk_index, embedding)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(StorageError::from)?;
            for (chunk, vector) in chunks.iter().zip(&vectors) {
                stmt.execute(params![
                    chunk.content,
                    source,
                    i64::try_from(chunk.chunk_index).unwrap_or(i64::MAX),
                    encode_vector(vector),
                ])
                .map_err(StorageError::from)?;
            }
        }
        tx.commit().map_err(StorageError::from)?;
        debug!(source, removed, written = chunks.len(), "replaced source");
        Ok(chunks.len())
    }

    /// Number of stored chunks.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database failure.
    pub fn chunk_count(&self) -> Result<usize, StorageError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Scans every row and keeps the `k` closest to `query_vec`.
    fn nearest(&self, query_vec: &[f32], k: usize) -> Result<Vec<(StoredChunk, f64)>, StorageError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, content, source, chunk_index, embedding FROM chunks")?;
        let rows = stmt.query_map([], |row| {
            let index: i64 = row.get(3)?;
            let blob: Vec<u8> = row.get(4)?;
            Ok((
                StoredChunk {
                    id: Some(row.get(0)?),
                    content: row.get(1)?,
                    source: row.get(2)?,
                    chunk_index: usize::try_from(index).unwrap_or(0),
                },
                blob,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (chunk, blob) = row?;
            let distance = cosine_distance(query_vec, &decode_vector(&blob));
            scored.push((chunk, distance));
        }
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        Ok(scored)
    }
}

#[async_trait]
impl EmbeddingStore for SqliteVectorStore {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(StoredChunk, f64)>, RetrievalError> {
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vec = vectors.pop().ok_or_else(|| RetrievalError::InvalidResponse {
            message: "no embedding returned for query".to_string(),
        })?;
        let hits = self.nearest(&query_vec, k)?;
        debug!(k, hits = hits.len(), "vector store search");
        Ok(hits)
    }
}

/// Cosine distance (`1 - cosine similarity`); `1.0` for zero vectors.
fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
