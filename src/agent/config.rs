//! Pipeline configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;
use crate::retrieval::embedding::{DEFAULT_EMBED_MODEL, DEFAULT_EMBED_URL};
use crate::tools::DEFAULT_FEEDS;

/// Default provider: a local Ollama server.
pub const DEFAULT_PROVIDER: &str = "ollama";
/// Ollama's OpenAI-compatible endpoint.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
/// Default chat model for every node.
pub const DEFAULT_MODEL: &str = "llama3.2";
/// Default max tokens per node response.
const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (`"ollama"` or `"openai"`).
    pub provider: String,
    /// API key; only required by hosted providers.
    pub api_key: Option<String>,
    /// Base URL override (for Ollama, proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the researcher node.
    pub researcher_model: String,
    /// Model for the analyst node.
    pub analyst_model: String,
    /// Model for the writer node.
    pub writer_model: String,
    /// Sampling temperature for every node.
    pub temperature: f32,
    /// Maximum tokens per node response.
    pub max_tokens: u32,
    /// Timeout applied to every outbound HTTP request.
    pub timeout: Duration,
    /// Base URL of the Ollama embedding server.
    pub embed_url: String,
    /// Embedding model name.
    pub embed_model: String,
    /// RSS/Atom feeds searched by the RSS tool.
    pub feeds: Vec<String>,
    /// Directory containing prompt template overrides.
    ///
    /// When set, prompts are loaded from markdown files in this directory,
    /// falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
    /// Suspend before the human approval node.
    pub human_approval: bool,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    researcher_model: Option<String>,
    analyst_model: Option<String>,
    writer_model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    embed_url: Option<String>,
    embed_model: Option<String>,
    feeds: Option<Vec<String>>,
    prompt_dir: Option<PathBuf>,
    human_approval: Option<bool>,
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = env("NEWS_NEXUS_PROVIDER");
        }
        if self.api_key.is_none() {
            self.api_key = env("NEWS_NEXUS_API_KEY").or_else(|| env("OPENAI_API_KEY"));
        }
        if self.base_url.is_none() {
            self.base_url = env("NEWS_NEXUS_BASE_URL").or_else(|| env("OPENAI_BASE_URL"));
        }
        if self.model.is_none() {
            self.model = env("NEWS_NEXUS_MODEL");
        }
        if self.researcher_model.is_none() {
            self.researcher_model = env("NEWS_NEXUS_RESEARCHER_MODEL");
        }
        if self.analyst_model.is_none() {
            self.analyst_model = env("NEWS_NEXUS_ANALYST_MODEL");
        }
        if self.writer_model.is_none() {
            self.writer_model = env("NEWS_NEXUS_WRITER_MODEL");
        }
        if self.timeout.is_none() {
            self.timeout = env("NEWS_NEXUS_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.embed_url.is_none() {
            self.embed_url = env("NEWS_NEXUS_EMBED_URL");
        }
        if self.embed_model.is_none() {
            self.embed_model = env("NEWS_NEXUS_EMBED_MODEL");
        }
        if self.feeds.is_none() {
            self.feeds = env("NEWS_NEXUS_FEEDS").map(|v| parse_feed_list(&v));
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env("NEWS_NEXUS_PROMPT_DIR").map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model used by every node without a role-specific model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the researcher model.
    #[must_use]
    pub fn researcher_model(mut self, model: impl Into<String>) -> Self {
        self.researcher_model = Some(model.into());
        self
    }

    /// Sets the analyst model.
    #[must_use]
    pub fn analyst_model(mut self, model: impl Into<String>) -> Self {
        self.analyst_model = Some(model.into());
        self
    }

    /// Sets the writer model.
    #[must_use]
    pub fn writer_model(mut self, model: impl Into<String>) -> Self {
        self.writer_model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the max tokens per response.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the embedding server URL.
    #[must_use]
    pub fn embed_url(mut self, url: impl Into<String>) -> Self {
        self.embed_url = Some(url.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = Some(model.into());
        self
    }

    /// Sets the feeds searched by the RSS tool.
    #[must_use]
    pub fn feeds(mut self, feeds: Vec<String>) -> Self {
        self.feeds = Some(feeds);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Enables or disables the human approval checkpoint.
    #[must_use]
    pub const fn human_approval(mut self, enabled: bool) -> Self {
        self.human_approval = Some(enabled);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if `openai` is selected without
    /// an API key.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let provider = self
            .provider
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
            .to_lowercase();
        if provider == "openai" && self.api_key.is_none() {
            return Err(AgentError::ApiKeyMissing);
        }
        let base_url = self.base_url.or_else(|| {
            (provider == DEFAULT_PROVIDER).then(|| DEFAULT_OLLAMA_BASE_URL.to_string())
        });
        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(AgentConfig {
            provider,
            api_key: self.api_key,
            base_url,
            researcher_model: self.researcher_model.unwrap_or_else(|| model.clone()),
            analyst_model: self.analyst_model.unwrap_or_else(|| model.clone()),
            writer_model: self.writer_model.unwrap_or(model),
            temperature: self.temperature.unwrap_or(0.0),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            embed_url: self
                .embed_url
                .unwrap_or_else(|| DEFAULT_EMBED_URL.to_string()),
            embed_model: self
                .embed_model
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
            feeds: self
                .feeds
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_FEEDS.iter().map(ToString::to_string).collect()),
            prompt_dir: self.prompt_dir,
            human_approval: self.human_approval.unwrap_or(false),
        })
    }
}

/// Splits a comma-separated feed list, dropping blanks.
fn parse_feed_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "ollama");
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url.as_deref(), Some(DEFAULT_OLLAMA_BASE_URL));
        assert_eq!(config.researcher_model, "llama3.2");
        assert_eq!(config.writer_model, "llama3.2");
        assert_eq!(config.feeds.len(), 3);
        assert_eq!(config.embed_model, DEFAULT_EMBED_MODEL);
        assert!(!config.human_approval);
    }

    #[test]
    fn test_builder_openai_requires_key() {
        let result = AgentConfig::builder().provider("openai").build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_openai_has_no_default_base_url() {
        let config = AgentConfig::builder()
            .provider("OpenAI")
            .api_key("key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .model("qwen2.5")
            .writer_model("llama3.1")
            .timeout(Duration::from_secs(30))
            .feeds(vec!["https://example.com/feed".to_string()])
            .human_approval(true)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.researcher_model, "qwen2.5");
        assert_eq!(config.analyst_model, "qwen2.5");
        assert_eq!(config.writer_model, "llama3.1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.feeds, vec!["https://example.com/feed".to_string()]);
        assert!(config.human_approval);
    }

    #[test]
    fn test_parse_feed_list() {
        assert_eq!(
            parse_feed_list(" https://a/feed , ,https://b/rss "),
            vec!["https://a/feed".to_string(), "https://b/rss".to_string()]
        );
    }
}
