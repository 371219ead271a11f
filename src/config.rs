//! Run configuration and input loading.
//!
//! Configuration is a single YAML file: the crawl origin, the search
//! terms, the CSS selectors that drive page-field extraction, the two
//! rate-gate intervals, and the classifier endpoint. Everything except
//! `base_url`, `terms`, `prompt`, and the classifier model has a
//! default matching typical usage.
//!
//! The source list is a separate newline-delimited file of absolute
//! novel URLs; blank lines and `#` comments are skipped. Any other
//! non-URL line is a startup-fatal error rather than a silent skip, so
//! a mangled list never yields a report that looks complete.

use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::error::FatalError;

/// Full run configuration, deserialized from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Origin base URL; relative chapter hrefs are resolved against it.
    pub base_url: String,
    /// Terms searched for verbatim (case-sensitive) in chapter text.
    pub terms: Vec<String>,
    /// How many chapters of each novel to inspect.
    #[serde(default = "default_chapter_limit")]
    pub chapter_limit: usize,
    /// System prompt sent to the classifier along with the chapter text.
    pub prompt: String,
    /// Optional `Cookie` header attached to every page request.
    #[serde(default)]
    pub cookie: Option<String>,
    /// Concurrent novels in flight.
    #[serde(default = "default_source_workers")]
    pub source_workers: usize,
    /// Concurrent chapter scans per novel.
    #[serde(default = "default_chapter_workers")]
    pub chapter_workers: usize,
    /// Minimum spacing between page fetches, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub page_interval_ms: u64,
    /// Minimum spacing between classifier calls, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub classifier_interval_ms: u64,
    /// CSS selectors for page-field extraction.
    #[serde(default)]
    pub selectors: SelectorConfig,
    /// Classifier endpoint settings.
    pub classifier: ClassifierConfig,
}

/// CSS selectors used to pull fields out of fetched pages.
///
/// Defaults match the common novel-reader layout: a paged chapter list
/// on the novel page and a single content div on chapter pages.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Anchor elements of the chapter list on a novel page.
    #[serde(default = "default_chapter_list_selector")]
    pub chapter_list: String,
    /// Primary text container on a chapter page.
    #[serde(default = "default_content_selector")]
    pub content: String,
    /// Novel title element.
    #[serde(default = "default_title_selector")]
    pub title: String,
    /// Category labels on the novel page.
    #[serde(default = "default_categories_selector")]
    pub categories: String,
    /// Tag labels on the novel page.
    #[serde(default = "default_tags_selector")]
    pub tags: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            chapter_list: default_chapter_list_selector(),
            content: default_content_selector(),
            title: default_title_selector(),
            categories: default_categories_selector(),
            tags: default_tags_selector(),
        }
    }
}

/// OpenAI-compatible classifier endpoint settings.
///
/// The API key is read from the environment (variable named by
/// `api_key_env`) rather than the config file so the file stays
/// shareable.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Base URL of the chat-completions API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Model identifier.
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_chapter_limit() -> usize {
    5
}

fn default_source_workers() -> usize {
    5
}

fn default_chapter_workers() -> usize {
    10
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_chapter_list_selector() -> String {
    "#chpagedlist ul.chapter-list li a".to_string()
}

fn default_content_selector() -> String {
    "div.chapter-content".to_string()
}

fn default_title_selector() -> String {
    "h1.novel-title".to_string()
}

fn default_categories_selector() -> String {
    "div.categories ul li a".to_string()
}

fn default_tags_selector() -> String {
    "div.tags ul li a".to_string()
}

/// Load and parse the YAML run configuration.
pub async fn load_config(path: &str) -> Result<RunConfig, FatalError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let config: RunConfig = serde_yaml::from_str(&raw)
        .map_err(|e| FatalError::Config(format!("invalid configuration in {path}: {e}")))?;
    info!(
        path,
        terms = config.terms.len(),
        chapter_limit = config.chapter_limit,
        "Loaded configuration"
    );
    Ok(config)
}

/// Load the newline-delimited source list.
///
/// Blank lines and `#` comments are skipped; every remaining line must
/// parse as an absolute URL or the whole startup fails.
pub async fn load_source_list(path: &str) -> Result<Vec<String>, FatalError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let mut sources = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Url::parse(line) {
            Ok(_) => sources.push(line.to_string()),
            Err(e) => {
                return Err(FatalError::MalformedSourceList {
                    line: index + 1,
                    reason: format!("{line:?}: {e}"),
                });
            }
        }
    }
    info!(path, count = sources.len(), "Loaded source list");
    Ok(sources)
}
