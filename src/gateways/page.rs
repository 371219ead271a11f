//! Rate-limited page fetching and field extraction.
//!
//! [`PageGateway`] is the single door to the crawl origin: every fetch
//! in the whole run goes through one gate that keeps at most one
//! request in flight and enforces a minimum spacing between requests,
//! no matter how wide the worker pools above are.
//!
//! Extraction happens synchronously inside the gateway, driven by the
//! configured CSS selectors, so callers receive plain owned fields and
//! the parsed DOM never crosses an await point.
//!
//! # Outcomes
//!
//! HTTP 403 and 404 mean "nothing here" and surface as
//! [`PageOutcome::NotFound`], a legitimate empty result. Every other
//! failure is [`FatalError`]: origin unavailability stops the run
//! instead of being retried into a masked outage.

use itertools::Itertools;
use reqwest::{Client, StatusCode, header};
use scraper::{Html, Selector};
use tokio::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::RunConfig;
use crate::error::FatalError;
use crate::gateways::rate::RateGate;

/// Result of fetching one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// The page exists; fields were extracted.
    Page(ParsedPage),
    /// The origin answered 403 or 404. Not an error.
    NotFound,
}

/// Fields extracted from a fetched page.
///
/// A novel page populates `chapter_links` and the metadata fields; a
/// chapter page populates `text`. Selectors that match nothing simply
/// leave their field empty, so one shape serves both page kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Whitespace-normalized text of the primary content element(s).
    pub text: String,
    /// Absolute chapter URLs, in document order, deduplicated.
    pub chapter_links: Vec<String>,
    /// Page title, when present.
    pub title: Option<String>,
    /// Category labels, when present.
    pub categories: Vec<String>,
    /// Tag labels, when present.
    pub tags: Vec<String>,
}

/// Capability seam for page retrieval, so the pipeline can be exercised
/// against doubles.
pub trait FetchPage {
    async fn fetch(&self, url: &str) -> Result<PageOutcome, FatalError>;
}

/// Compiled field selectors.
#[derive(Debug)]
struct FieldSelectors {
    chapter_list: Selector,
    content: Selector,
    title: Selector,
    categories: Selector,
    tags: Selector,
}

impl FieldSelectors {
    fn compile(config: &RunConfig) -> Result<Self, FatalError> {
        Ok(Self {
            chapter_list: parse_selector("chapter_list", &config.selectors.chapter_list)?,
            content: parse_selector("content", &config.selectors.content)?,
            title: parse_selector("title", &config.selectors.title)?,
            categories: parse_selector("categories", &config.selectors.categories)?,
            tags: parse_selector("tags", &config.selectors.tags)?,
        })
    }
}

fn parse_selector(name: &str, raw: &str) -> Result<Selector, FatalError> {
    Selector::parse(raw).map_err(|e| FatalError::BadSelector {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Serialized, rate-limited access to the crawl origin.
#[derive(Debug)]
pub struct PageGateway {
    client: Client,
    gate: RateGate,
    base_url: Url,
    cookie: Option<String>,
    selectors: FieldSelectors,
}

impl PageGateway {
    pub fn new(config: &RunConfig) -> Result<Self, FatalError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FatalError::Config(format!("invalid base_url {:?}: {e}", config.base_url)))?;
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(FatalError::HttpClient)?;

        Ok(Self {
            client,
            gate: RateGate::new(Duration::from_millis(config.page_interval_ms)),
            base_url,
            cookie: config.cookie.clone(),
            selectors: FieldSelectors::compile(config)?,
        })
    }

    fn extract(&self, body: &str) -> ParsedPage {
        extract_fields(body, &self.selectors, &self.base_url)
    }
}

impl FetchPage for PageGateway {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<PageOutcome, FatalError> {
        let _permit = self.gate.throttle().await;

        let mut request = self.client.get(url);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.map_err(|e| FatalError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::NOT_FOUND {
            warn!(%url, %status, "Page not available");
            return Ok(PageOutcome::NotFound);
        }
        if !status.is_success() {
            return Err(FatalError::BadStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|e| FatalError::Transport {
            url: url.to_string(),
            source: e,
        })?;

        let page = self.extract(&body);
        debug!(
            %url,
            text_bytes = page.text.len(),
            chapter_links = page.chapter_links.len(),
            "Fetched and extracted page"
        );
        Ok(PageOutcome::Page(page))
    }
}

/// Pull the configured fields out of an HTML body.
///
/// Chapter hrefs are resolved against `base_url` (unresolvable hrefs are
/// dropped) and deduplicated preserving document order.
fn extract_fields(body: &str, selectors: &FieldSelectors, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(body);

    let text = document
        .select(&selectors.content)
        .flat_map(|element| element.text())
        .join(" ");
    let text = normalize_whitespace(&text);

    let chapter_links = document
        .select(&selectors.chapter_list)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| base_url.join(href).ok())
        .map(|resolved| resolved.to_string())
        .unique()
        .collect();

    let title = document
        .select(&selectors.title)
        .next()
        .map(|element| normalize_whitespace(&element.text().join(" ")))
        .filter(|title| !title.is_empty());

    let categories = select_labels(&document, &selectors.categories);
    let tags = select_labels(&document, &selectors.tags);

    ParsedPage {
        text,
        chapter_links,
        title,
        categories,
        tags,
    }
}

fn select_labels(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .map(|element| normalize_whitespace(&element.text().join(" ")))
        .filter(|label| !label.is_empty())
        .unique()
        .collect()
}

fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().join(" ")
}
