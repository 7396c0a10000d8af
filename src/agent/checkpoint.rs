//! Durable checkpoints for suspended pipeline runs.
//!
//! A run that reaches the human approval node is serialized together with
//! its resume cursor under its thread id. [`SqliteCheckpointStore`] keeps
//! checkpoints across process restarts; [`MemoryCheckpointStore`] serves
//! one-shot runs and tests. Checkpoints are never expired implicitly; call
//! [`CheckpointStore::prune`] to drop stale ones.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::graph::NodeId;
use super::state::PipelineState;
use crate::error::StorageError;

/// A suspended (or completed) run.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphCheckpoint {
    /// Run identifier.
    pub thread_id: String,
    /// State at the time of suspension.
    pub state: PipelineState,
    /// Node the run resumes at; [`NodeId::End`] once approved.
    pub paused_at: NodeId,
    /// When the run first suspended.
    pub created_at: DateTime<Utc>,
    /// When the checkpoint was last written.
    pub updated_at: DateTime<Utc>,
}

impl GraphCheckpoint {
    /// Creates a checkpoint stamped with the current time.
    #[must_use]
    pub fn new(thread_id: impl Into<String>, state: PipelineState, paused_at: NodeId) -> Self {
        let now = Utc::now();
        Self {
            thread_id: thread_id.into(),
            state,
            paused_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the run was approved.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.paused_at == NodeId::End
    }
}

/// Persistence for [`GraphCheckpoint`]s keyed by thread id.
pub trait CheckpointStore: Send + Sync {
    /// Inserts or replaces the checkpoint for its thread.
    ///
    /// The original `created_at` of an existing checkpoint is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or serialization failure.
    fn save(&self, checkpoint: &GraphCheckpoint) -> Result<(), StorageError>;

    /// Loads the checkpoint for `thread_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database or decoding failure.
    fn load(&self, thread_id: &str) -> Result<Option<GraphCheckpoint>, StorageError>;

    /// Deletes the checkpoint for `thread_id`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database failure.
    fn delete(&self, thread_id: &str) -> Result<bool, StorageError>;

    /// Deletes checkpoints last written before `cutoff`. Returns the count.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on database failure.
    fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError>;
}

/// SQLite-backed checkpoint store.
pub struct SqliteCheckpointStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteCheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCheckpointStore").finish_non_exhaustive()
    }
}

impl SqliteCheckpointStore {
    /// Opens (creating if needed) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the directory or schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
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
        Self::with_connection(conn)
    }

    /// Opens a transient in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT PRIMARY KEY,
                paused_at TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_checkpoints_updated ON checkpoints(updated_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn save(&self, checkpoint: &GraphCheckpoint) -> Result<(), StorageError> {
        let state = serde_json::to_string(&checkpoint.state)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO checkpoints (thread_id, paused_at, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(thread_id) DO UPDATE SET
                paused_at = excluded.paused_at,
                state = excluded.state,
                updated_at = excluded.updated_at",
            params![
                checkpoint.thread_id,
                checkpoint.paused_at.as_str(),
                state,
                checkpoint.created_at.timestamp_millis(),
                checkpoint.updated_at.timestamp_millis(),
            ],
        )?;
        debug!(
            thread_id = %checkpoint.thread_id,
            paused_at = %checkpoint.paused_at,
            messages = checkpoint.state.messages.len(),
            "checkpoint saved"
        );
        Ok(())
    }

    fn load(&self, thread_id: &str) -> Result<Option<GraphCheckpoint>, StorageError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT paused_at, state, created_at, updated_at
                 FROM checkpoints WHERE thread_id = ?1",
                params![thread_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);

        let Some((paused_at, state, created_at, updated_at)) = row else {
            return Ok(None);
        };
        let paused_at = NodeId::parse(&paused_at).ok_or_else(|| StorageError::Corrupt {
            key: thread_id.to_string(),
            message: format!("unknown node '{paused_at}'"),
        })?;
        let state: PipelineState = serde_json::from_str(&state)?;
        debug!(thread_id, %paused_at, "checkpoint loaded");

        Ok(Some(GraphCheckpoint {
            thread_id: thread_id.to_string(),
            state,
            paused_at,
            created_at: DateTime::from_timestamp_millis(created_at).unwrap_or_default(),
            updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_default(),
        }))
    }

    fn delete(&self, thread_id: &str) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let n = conn.execute(
            "DELETE FROM checkpoints WHERE thread_id = ?1",
            params![thread_id],
        )?;
        Ok(n > 0)
    }

    fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let conn = self.lock()?;
        let n = conn.execute(
            "DELETE FROM checkpoints WHERE updated_at < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        debug!(pruned = n, %cutoff, "checkpoints pruned");
        Ok(n)
    }
}

/// In-process checkpoint store.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    checkpoints: Mutex<HashMap<String, GraphCheckpoint>>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, GraphCheckpoint>>, StorageError> {
        self.checkpoints.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, checkpoint: &GraphCheckpoint) -> Result<(), StorageError> {
        let mut map = self.lock()?;
        let mut stored = checkpoint.clone();
        if let Some(existing) = map.get(&checkpoint.thread_id) {
            stored.created_at = existing.created_at;
        }
        map.insert(checkpoint.thread_id.clone(), stored);
        Ok(())
    }

    fn load(&self, thread_id: &str) -> Result<Option<GraphCheckpoint>, StorageError> {
        Ok(self.lock()?.get(thread_id).cloned())
    }

    fn delete(&self, thread_id: &str) -> Result<bool, StorageError> {
        Ok(self.lock()?.remove(thread_id).is_some())
    }

    fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let mut map = self.lock()?;
        let before = map.len();
        map.retain(|_, c| c.updated_at >= cutoff);
        Ok(before - map.len())
    }
}
