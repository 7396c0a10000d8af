//! Core value types shared by retrieval, tools and the agent graph.

pub mod document;
pub mod text;

pub use document::{RetrievedDocument, StoredChunk};
pub use text::{query_terms, word_tokens};
