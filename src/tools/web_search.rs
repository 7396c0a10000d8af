//! General web search.
//!
//! The researcher sees one formatted block per query. [`DuckDuckGoSearch`]
//! scrapes the keyless HTML endpoint; anything else implementing
//! [`WebSearchProvider`] can be swapped in.

use std::time::Duration;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use reqwest::Url;
use tracing::debug;

use super::RESULT_SEPARATOR;
use crate::error::AgentError;

/// Results kept per query.
pub const WEB_SEARCH_MAX_RESULTS: usize = 5;

/// Sentinel returned when the search has no hits.
pub const NO_WEB_RESULTS: &str = "No results found";

const TOOL_NAME: &str = "web_search";
const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; news-nexus)";

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Page title.
    pub title: String,
    /// Target URL.
    pub href: String,
    /// Result snippet.
    pub body: String,
}

/// A web search backend.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Returns up to `max_results` hits for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] if the backend is unreachable.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, AgentError>;
}

/// Searches the DuckDuckGo HTML endpoint.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
    patterns: ResultPatterns,
}

impl DuckDuckGoSearch {
    /// Creates a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] if the HTTP client cannot be
    /// built.
    pub fn new(timeout: Duration) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| tool_error(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: DUCKDUCKGO_HTML_URL.to_string(),
            patterns: ResultPatterns::new()?,
        })
    }
}

/// Compiled patterns for the results page markup.
#[derive(Debug, Clone)]
pub struct ResultPatterns {
    link: Regex,
    snippet: Regex,
    href: Regex,
    tag: Regex,
}

impl ResultPatterns {
    /// Compiles the result page patterns.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] if a pattern fails to compile.
    pub fn new() -> Result<Self, AgentError> {
        Ok(Self {
            link: compile(r#"<a\s([^>]*class="result__a"[^>]*)>(.*?)</a>"#)?,
            snippet: compile(r#"<a\s[^>]*class="result__snippet"[^>]*>(.*?)</a>"#)?,
            href: compile(r#"href="([^"]*)""#)?,
            tag: compile(r"<[^>]+>")?,
        })
    }

    /// Extracts result titles, links and snippets from a results page.
    #[must_use]
    pub fn parse(&self, html: &str, max_results: usize) -> Vec<SearchHit> {
        let links: Vec<_> = self.link.captures_iter(html).collect();
        let mut hits = Vec::new();

        for (i, link) in links.iter().enumerate() {
            if hits.len() >= max_results {
                break;
            }
            let (Some(whole), Some(attrs), Some(title)) = (link.get(0), link.get(1), link.get(2))
            else {
                continue;
            };
            let Some(href) = self.href.captures(attrs.as_str()).and_then(|c| c.get(1)) else {
                continue;
            };

            // A snippet belongs to the link it follows, up to the next link.
            let block_end = links
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(html.len(), |m| m.start());
            let body = self
                .snippet
                .captures(&html[whole.end()..block_end])
                .and_then(|c| c.get(1))
                .map(|m| self.clean_text(m.as_str()))
                .unwrap_or_default();

            hits.push(SearchHit {
                title: self.clean_text(title.as_str()),
                href: resolve_href(href.as_str()),
                body,
            });
        }
        hits
    }

    fn clean_text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, "");
        decode_entities(&stripped)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn compile(pattern: &str) -> Result<Regex, AgentError> {
    RegexBuilder::new(pattern)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| tool_error(format!("invalid pattern: {e}")))
}

fn tool_error(message: impl Into<String>) -> AgentError {
    AgentError::ToolExecution {
        name: TOOL_NAME.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl WebSearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, AgentError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| tool_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(tool_error(format!("search endpoint returned {status}")));
        }
        let html = response.text().await.map_err(|e| tool_error(e.to_string()))?;
        Ok(self.patterns.parse(&html, max_results))
    }
}

/// Unwraps DuckDuckGo redirect links to the target URL.
fn resolve_href(raw: &str) -> String {
    let href = decode_entities(raw);
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href
    };
    match Url::parse(&absolute) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map_or_else(|| url.to_string(), |(_, target)| target.into_owned()),
        Err(_) => absolute,
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Formats hits for the researcher.
#[must_use]
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_WEB_RESULTS.to_string();
    }
    hits.iter()
        .map(|hit| {
            format!(
                "Title: {}\nLink: [{}]({})\nSnippet: {}",
                hit.title, hit.title, hit.href, hit.body
            )
        })
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR)
}

/// Runs a search and formats the top results.
///
/// # Errors
///
/// Propagates backend failures.
pub async fn web_search(provider: &dyn WebSearchProvider, query: &str) -> Result<String, AgentError> {
    let hits = provider.search(query, WEB_SEARCH_MAX_RESULTS).await?;
    debug!(backend = provider.name(), query, hits = hits.len(), "web search");
    Ok(format_hits(&hits))
}
