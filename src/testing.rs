//! Shared test doubles for the gateway seams.
//!
//! `StubPages` serves scripted pages and records every fetched URL;
//! `ScriptedClassifier` returns a fixed outcome and counts invocations.
//! Both let the pipeline tests assert on network behavior (call counts,
//! skipped URLs) without any I/O.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::{ClassifierConfig, RunConfig, SelectorConfig};
use crate::error::FatalError;
use crate::gateways::classifier::{Classify, Verdict};
use crate::gateways::page::{FetchPage, PageOutcome, ParsedPage};

/// A usable config for tests: example.com origin, default selectors,
/// single-worker-friendly intervals of zero.
pub(crate) fn test_config(terms: &[&str]) -> RunConfig {
    RunConfig {
        base_url: "https://example.com".to_string(),
        terms: terms.iter().map(|t| t.to_string()).collect(),
        chapter_limit: 5,
        prompt: "Does this text match? Answer yes or no.".to_string(),
        cookie: None,
        source_workers: 5,
        chapter_workers: 10,
        page_interval_ms: 0,
        classifier_interval_ms: 0,
        selectors: SelectorConfig::default(),
        classifier: ClassifierConfig {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "test-model".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        },
    }
}

/// A chapter page containing the given text.
pub(crate) fn chapter_page(text: &str) -> PageOutcome {
    PageOutcome::Page(ParsedPage {
        text: text.to_string(),
        ..ParsedPage::default()
    })
}

/// A novel page exposing the given chapter links.
pub(crate) fn novel_page(title: &str, links: &[&str]) -> PageOutcome {
    PageOutcome::Page(ParsedPage {
        title: Some(title.to_string()),
        chapter_links: links.iter().map(|l| l.to_string()).collect(),
        ..ParsedPage::default()
    })
}

enum StubResponse {
    Outcome(PageOutcome),
    Fatal,
}

/// Scripted page gateway that logs every fetch.
pub(crate) struct StubPages {
    responses: HashMap<String, StubResponse>,
    calls: Mutex<Vec<String>>,
}

impl StubPages {
    pub(crate) fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with(mut self, url: &str, outcome: PageOutcome) -> Self {
        self.responses
            .insert(url.to_string(), StubResponse::Outcome(outcome));
        self
    }

    /// Make fetches of `url` fail with a fatal transport-class error.
    pub(crate) fn with_fatal(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), StubResponse::Fatal);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl FetchPage for StubPages {
    async fn fetch(&self, url: &str) -> Result<PageOutcome, FatalError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(StubResponse::Outcome(outcome)) => Ok(outcome.clone()),
            Some(StubResponse::Fatal) => Err(FatalError::BadStatus {
                url: url.to_string(),
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            }),
            None => Ok(PageOutcome::NotFound),
        }
    }
}

enum ScriptedOutcome {
    Verdict(Verdict),
    Quota,
}

/// Classifier double with a fixed outcome and a call counter.
pub(crate) struct ScriptedClassifier {
    outcome: ScriptedOutcome,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub(crate) fn yes() -> Self {
        Self::with_verdict(Verdict::Yes)
    }

    pub(crate) fn no() -> Self {
        Self::with_verdict(Verdict::No)
    }

    pub(crate) fn rejected() -> Self {
        Self::with_verdict(Verdict::ContentPolicyRejected)
    }

    pub(crate) fn quota_exhausted() -> Self {
        Self {
            outcome: ScriptedOutcome::Quota,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_verdict(verdict: Verdict) -> Self {
        Self {
            outcome: ScriptedOutcome::Verdict(verdict),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classify for ScriptedClassifier {
    async fn classify(&self, _text: &str) -> Result<Verdict, FatalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            ScriptedOutcome::Verdict(verdict) => Ok(*verdict),
            ScriptedOutcome::Quota => {
                Err(FatalError::QuotaExceeded("scripted quota failure".to_string()))
            }
        }
    }
}
