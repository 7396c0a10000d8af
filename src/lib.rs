//! # news-nexus
//!
//! A researcher → analyst → writer newsletter pipeline.
//!
//! Internal PDFs are split into chunks and embedded into a SQLite vector
//! store. For a given topic, the researcher agent asks the model which tools
//! to call (internal document lookup, web search, RSS feeds), the analyst
//! turns the gathered findings into insights, and the writer compiles an
//! HTML newsletter. Runs can stop at a human approval checkpoint, persisted
//! so that feedback can be given later, even from another process.
//!
//! ## Modules
//!
//! - [`retrieval`]: embedding store and keyword-boosted retrieval
//! - [`ingest`]: PDF text extraction and chunking
//! - [`tools`]: the research tools
//! - [`agent`]: providers, node agents, checkpoints and the pipeline graph
//! - [`cli`]: command-line interface

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod ingest;
pub mod retrieval;
pub mod tools;

pub use error::{Error, Result};
