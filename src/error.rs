//! Error types for news-nexus.
//!
//! Each layer owns an error enum; [`Error`] aggregates them for callers that
//! only need to report a failure.

use thiserror::Error;

/// Convenience result alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Retrieval failure.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Agent pipeline failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the SQLite-backed stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// State could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database path could not be prepared.
    #[error("cannot open database at {path}: {message}")]
    Open {
        /// Database path.
        path: String,
        /// Underlying cause.
        message: String,
    },

    /// A stored row could not be decoded.
    #[error("corrupt record '{key}': {message}")]
    Corrupt {
        /// Row key.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// A store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Errors raised while embedding a query or searching the vector store.
///
/// Retrieval never retries; every variant propagates to the caller.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The embedding endpoint failed or was unreachable.
    #[error("embedding request failed: {message}")]
    Embedding {
        /// Description of the failure.
        message: String,
    },

    /// The embedding endpoint answered with an unexpected payload.
    #[error("invalid embedding response: {message}")]
    InvalidResponse {
        /// Description of the malformed payload.
        message: String,
    },

    /// The backing store failed.
    #[error("vector store error: {0}")]
    Store(#[from] StorageError),
}

/// Errors raised by the agent pipeline.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The configured LLM provider is not supported.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name from configuration.
        name: String,
    },

    /// A hosted provider was selected without an API key.
    #[error("API key missing: set OPENAI_API_KEY or NEWS_NEXUS_API_KEY")]
    ApiKeyMissing,

    /// A language model request failed.
    #[error("LLM API request failed: {message}")]
    ApiRequest {
        /// Error message from the provider.
        message: String,
        /// HTTP status, if known.
        status: Option<u16>,
    },

    /// A tool failed to reach its upstream service.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// A pipeline stage failed; the run is aborted.
    #[error("stage {stage} failed for query '{query}': {message}")]
    StageFailed {
        /// Node that failed.
        stage: String,
        /// Query or topic the stage was processing.
        query: String,
        /// Underlying failure.
        message: String,
    },

    /// Resume was requested for a thread with no checkpoint.
    #[error("no checkpoint found for thread '{thread_id}'")]
    InvalidResumeState {
        /// Thread identifier.
        thread_id: String,
    },

    /// Feedback was submitted for a run that was already approved.
    #[error("run '{thread_id}' is already approved and complete")]
    RunAlreadyCompleted {
        /// Thread identifier.
        thread_id: String,
    },

    /// Checkpoint persistence failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] StorageError),
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command failed to execute.
    #[error("{0}")]
    ExecutionFailed(String),

    /// An argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
