//! Per-chapter term scanning: cheap lexical filter first, expensive
//! classifier second.
//!
//! The classifier only ever runs when at least one configured term
//! occurs verbatim in the chapter text; missing pages, empty text, and
//! lexically clean text all short-circuit to an all-false verdict
//! without spending a classifier call. A confirmed page marks every
//! configured term true: the classification is a whole-page yes/no
//! gated by the lexical pre-filter, not a per-term judgement.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::FatalError;
use crate::gateways::classifier::{Classify, Verdict};
use crate::gateways::page::{FetchPage, PageOutcome};

/// Scans one chapter at a time against a fixed term list.
pub struct ChapterScanner<'a, P, C> {
    pages: &'a P,
    classifier: &'a C,
    terms: &'a [String],
}

impl<'a, P, C> ChapterScanner<'a, P, C>
where
    P: FetchPage,
    C: Classify,
{
    pub fn new(pages: &'a P, classifier: &'a C, terms: &'a [String]) -> Self {
        Self {
            pages,
            classifier,
            terms,
        }
    }

    /// Produce the term→verdict map for one chapter page.
    ///
    /// Non-fatal conditions (missing page, policy-refused text) are
    /// absorbed here as all-false; fatal gateway errors propagate.
    pub async fn scan(&self, chapter_url: &str) -> Result<BTreeMap<String, bool>, FatalError> {
        let page = match self.pages.fetch(chapter_url).await? {
            PageOutcome::Page(page) => page,
            PageOutcome::NotFound => {
                debug!(url = %chapter_url, "Chapter missing; recording all-false");
                return Ok(self.verdicts(false));
            }
        };

        if page.text.is_empty() {
            debug!(url = %chapter_url, "No extractable text; recording all-false");
            return Ok(self.verdicts(false));
        }

        // Verbatim, case-sensitive substring test.
        let lexical_hit = self.terms.iter().any(|term| page.text.contains(term.as_str()));
        if !lexical_hit {
            return Ok(self.verdicts(false));
        }

        match self.classifier.classify(&page.text).await? {
            Verdict::Yes => {
                debug!(url = %chapter_url, "Classifier confirmed match");
                Ok(self.verdicts(true))
            }
            Verdict::No | Verdict::ContentPolicyRejected => Ok(self.verdicts(false)),
        }
    }

    fn verdicts(&self, found: bool) -> BTreeMap<String, bool> {
        self.terms
            .iter()
            .map(|term| (term.clone(), found))
            .collect()
    }
}
