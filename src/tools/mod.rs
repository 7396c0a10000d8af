//! Research tools the researcher node can call.
//!
//! Each tool takes a free-text query and returns one formatted text block
//! with source attribution. An empty result is a sentinel string, not an
//! error; only upstream failures (store, search provider) are errors, and
//! the RSS tool isolates those per feed.

pub mod policy_docs;
pub mod rss;
pub mod web_search;

pub use policy_docs::{PolicyDocsTool, sanitize_query};
pub use rss::{DEFAULT_FEEDS, FeedEntry, FeedFetcher, HttpFeedFetcher, NO_RSS_MATCHES, rss_search};
pub use web_search::{
    DuckDuckGoSearch, NO_WEB_RESULTS, ResultPatterns, SearchHit, WebSearchProvider, web_search,
};

/// Separator between web search and RSS results.
pub const RESULT_SEPARATOR: &str = "\n\n---\n";
