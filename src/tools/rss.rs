//! Keyword search over a fixed set of news feeds.
//!
//! Feeds are fetched one after another. A feed that cannot be fetched or
//! parsed is logged and skipped, so one bad feed never fails the search.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use super::RESULT_SEPARATOR;
use crate::core::word_tokens;
use crate::error::AgentError;

/// Feeds polled when none are configured.
pub const DEFAULT_FEEDS: [&str; 3] = [
    "https://www.technologyreview.com/feed/",
    "https://openai.com/news/rss.xml",
    "https://techcrunch.com/feed/",
];

/// Entries considered per feed.
pub const ENTRIES_PER_FEED: usize = 10;

/// Sentinel returned when no entry matches.
pub const NO_RSS_MATCHES: &str = "No matching RSS entries found";

const TOOL_NAME: &str = "rss_feed_search";

/// One feed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// Entry title.
    pub title: String,
    /// Description, summary or content, whichever comes first.
    pub summary: String,
    /// Entry URL.
    pub link: String,
}

/// Fetches and parses a feed.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Returns the entries of the feed at `url` in document order.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] if the feed cannot be fetched
    /// or parsed.
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, AgentError>;
}

/// Fetches feeds over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    /// Creates a fetcher with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] if the HTTP client cannot be
    /// built.
    pub fn new(timeout: Duration) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::ToolExecution {
                name: TOOL_NAME.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

fn feed_error(url: &str, message: impl std::fmt::Display) -> AgentError {
    AgentError::ToolExecution {
        name: TOOL_NAME.to_string(),
        message: format!("{url}: {message}"),
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, AgentError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| feed_error(url, e))?;
        let body = response.text().await.map_err(|e| feed_error(url, e))?;
        parse_feed(&body).map_err(|e| feed_error(url, e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Summary,
    Link,
}

/// Parses RSS `<item>` and Atom `<entry>` elements.
///
/// # Errors
///
/// Returns the XML reader error message on malformed input.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, String> {
    let mut reader = quick_xml::Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => current = Some(FeedEntry::default()),
                b"title" if current.is_some() => field = Some(Field::Title),
                b"description" | b"summary" | b"content" | b"encoded" => {
                    if current.as_ref().is_some_and(|c| c.summary.is_empty()) {
                        field = Some(Field::Summary);
                    }
                }
                b"link" => {
                    if let Some(entry) = current.as_mut() {
                        match alternate_href(&e) {
                            Some(href) if entry.link.is_empty() => entry.link = href,
                            Some(_) => {}
                            None => field = Some(Field::Link),
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link"
                    && let Some(entry) = current.as_mut()
                    && entry.link.is_empty()
                    && let Some(href) = alternate_href(&e)
                {
                    entry.link = href;
                }
            }
            Ok(Event::Text(te)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    append(entry, f, &te.unescape().unwrap_or_default());
                }
            }
            Ok(Event::CData(cd)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    append(entry, f, &String::from_utf8_lossy(&cd));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    entries.extend(current.take());
                    field = None;
                }
                b"title" | b"description" | b"summary" | b"content" | b"encoded" | b"link" => {
                    field = None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

fn append(entry: &mut FeedEntry, field: Field, text: &str) {
    let target = match field {
        Field::Title => &mut entry.title,
        Field::Summary => &mut entry.summary,
        Field::Link => &mut entry.link,
    };
    if !target.is_empty() && field != Field::Link {
        target.push(' ');
    }
    target.push_str(text.trim());
}

/// Atom `href` of a link that is absent `rel` or `rel="alternate"`.
fn alternate_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut alternate = true;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"href" => href = Some(String::from_utf8_lossy(&attr.value).into_owned()),
            b"rel" => alternate = attr.value.as_ref() == b"alternate",
            _ => {}
        }
    }
    href.filter(|_| alternate)
}

/// Whether `entry`'s title or summary shares a word with the query.
#[must_use]
pub fn entry_matches(entry: &FeedEntry, query_tokens: &HashSet<String>) -> bool {
    let tokens = word_tokens(&format!("{} {}", entry.title, entry.summary));
    !tokens.is_disjoint(query_tokens)
}

fn format_entries(entries: &[FeedEntry]) -> String {
    if entries.is_empty() {
        return NO_RSS_MATCHES.to_string();
    }
    entries
        .iter()
        .map(|e| format!("Title: {}\nLink: [{}]({})", e.title, e.title, e.link))
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR)
}

/// Searches the first [`ENTRIES_PER_FEED`] entries of each feed.
///
/// Never fails: unreachable feeds are skipped.
pub async fn rss_search(fetcher: &dyn FeedFetcher, feeds: &[String], query: &str) -> String {
    let query_tokens = word_tokens(query);
    let mut matched = Vec::new();

    for url in feeds {
        match fetcher.fetch(url).await {
            Ok(entries) => {
                let before = matched.len();
                matched.extend(
                    entries
                        .into_iter()
                        .take(ENTRIES_PER_FEED)
                        .filter(|e| entry_matches(e, &query_tokens)),
                );
                debug!(feed = %url, matches = matched.len() - before, "feed searched");
            }
            Err(e) => warn!(feed = %url, error = %e, "skipping feed"),
        }
    }
    format_entries(&matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Channel title about models</title>
  <item>
    <title>OpenAI releases new model</title>
    <link>https://example.com/openai-model</link>
    <description><![CDATA[<p>A new frontier model.</p>]]></description>
  </item>
  <item>
    <title>Quantum chips &amp; qubits</title>
    <link>https://example.com/quantum</link>
    <description>Hardware news</description>
  </item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom feed</title>
  <entry>
    <title>Robotics roundup</title>
    <link rel="self" href="https://example.com/self"/>
    <link rel="alternate" href="https://example.com/robotics"/>
    <summary>Humanoid robots in warehouses</summary>
  </entry>
</feed>"#;

    struct MapFetcher(HashMap<String, Result<Vec<FeedEntry>, String>>);

    #[async_trait]
    impl FeedFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, AgentError> {
            match self.0.get(url) {
                Some(Ok(entries)) => Ok(entries.clone()),
                Some(Err(msg)) => Err(feed_error(url, msg)),
                None => Err(feed_error(url, "not found")),
            }
        }
    }

    fn entry(title: &str) -> FeedEntry {
        FeedEntry {
            title: title.to_string(),
            summary: String::new(),
            link: format!("https://example.com/{}", title.len()),
        }
    }

    #[test]
    fn test_parse_rss_items() {
        let entries = parse_feed(RSS).unwrap_or_default();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "OpenAI releases new model");
        assert_eq!(entries[0].link, "https://example.com/openai-model");
        assert!(entries[0].summary.contains("frontier model"));
        assert_eq!(entries[1].title, "Quantum chips & qubits");
    }

    #[test]
    fn test_parse_atom_entries_prefers_alternate_link() {
        let entries = parse_feed(ATOM).unwrap_or_default();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Robotics roundup");
        assert_eq!(entries[0].link, "https://example.com/robotics");
        assert_eq!(entries[0].summary, "Humanoid robots in warehouses");
    }

    #[test]
    fn test_http_fetcher_builds_with_timeout() {
        assert!(HttpFeedFetcher::new(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_parse_malformed_feed() {
        assert!(parse_feed("<rss><item><title>x</item></rss>").is_err());
    }

    #[test]
    fn test_entry_matches_case_insensitive_words() {
        let query = word_tokens("openai model");
        assert!(entry_matches(&entry("OpenAI releases new model"), &query));
        assert!(!entry_matches(&entry("Modeling clay for kids"), &query));
    }

    #[tokio::test]
    async fn test_rss_search_matches_and_formats() {
        let url = "https://feed.one/".to_string();
        let fetcher = MapFetcher(HashMap::from([(url.clone(), parse_feed(RSS))]));
        let out = rss_search(&fetcher, &[url], "openai model").await;
        assert_eq!(
            out,
            "Title: OpenAI releases new model\n\
             Link: [OpenAI releases new model](https://example.com/openai-model)"
        );
    }

    #[tokio::test]
    async fn test_rss_search_isolates_failing_feed() {
        let good = "https://good/".to_string();
        let bad = "https://bad/".to_string();
        let fetcher = MapFetcher(HashMap::from([
            (bad.clone(), Err("timeout".to_string())),
            (good.clone(), Ok(vec![entry("AI policy update")])),
        ]));
        let out = rss_search(&fetcher, &[bad, good], "policy").await;
        assert!(out.contains("AI policy update"));
    }

    #[tokio::test]
    async fn test_rss_search_only_first_entries_per_feed() {
        let url = "https://busy/".to_string();
        let mut entries: Vec<FeedEntry> = (0..ENTRIES_PER_FEED).map(|_| entry("filler")).collect();
        entries.push(entry("late robotics story"));
        let fetcher = MapFetcher(HashMap::from([(url.clone(), Ok(entries))]));
        let out = rss_search(&fetcher, &[url], "robotics").await;
        assert_eq!(out, NO_RSS_MATCHES);
    }

    #[tokio::test]
    async fn test_rss_search_all_feeds_down() {
        let fetcher = MapFetcher(HashMap::new());
        let feeds: Vec<String> = DEFAULT_FEEDS.iter().map(ToString::to_string).collect();
        assert_eq!(rss_search(&fetcher, &feeds, "ai").await, NO_RSS_MATCHES);
    }
}
