//! Per-novel processing: enumerate the chapter prefix, scan chapters
//! concurrently, stop at the first confirmed hit.
//!
//! A novel whose page is missing or whose chapter list the selectors do
//! not recognize yields an empty entry: a recorded "visited, nothing
//! found", not an error. Chapter scans run through a bounded
//! `buffer_unordered` pool, and the first scan *in completion order*
//! with a confirmed term ends the novel: in-flight and not-yet-started
//! scans are dropped and only the results collected so far are kept.
//! Chapter order in the output therefore varies across runs, but
//! whether a novel is detected does not.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument};

use crate::config::RunConfig;
use crate::error::FatalError;
use crate::gateways::classifier::Classify;
use crate::gateways::page::{FetchPage, PageOutcome};
use crate::models::{ChapterRecord, SourceEntry};
use crate::scanner::ChapterScanner;

/// Processes one novel at a time against the configured term list.
pub struct SourceProcessor<'a, P, C> {
    pages: &'a P,
    classifier: &'a C,
    config: &'a RunConfig,
}

impl<'a, P, C> SourceProcessor<'a, P, C>
where
    P: FetchPage,
    C: Classify,
{
    pub fn new(pages: &'a P, classifier: &'a C, config: &'a RunConfig) -> Self {
        Self {
            pages,
            classifier,
            config,
        }
    }

    /// Visit one novel and return its entry for the checkpoint.
    #[instrument(level = "info", skip(self))]
    pub async fn process(&self, source_url: &str) -> Result<SourceEntry, FatalError> {
        let mut entry = SourceEntry {
            source_id: source_url.to_string(),
            title: None,
            categories: Vec::new(),
            tags: Vec::new(),
            results: Vec::new(),
        };

        let chapter_links = match self.pages.fetch(source_url).await? {
            PageOutcome::NotFound => {
                info!(url = %source_url, "Novel page missing; recording empty entry");
                return Ok(entry);
            }
            PageOutcome::Page(page) => {
                entry.title = page.title;
                entry.categories = page.categories;
                entry.tags = page.tags;
                page.chapter_links
                    .into_iter()
                    .take(self.config.chapter_limit)
                    .collect::<Vec<_>>()
            }
        };

        if chapter_links.is_empty() {
            info!(url = %source_url, "No chapter list recognized; recording empty entry");
            return Ok(entry);
        }
        debug!(url = %source_url, chapters = chapter_links.len(), "Scanning chapter prefix");

        let scanner = ChapterScanner::new(self.pages, self.classifier, &self.config.terms);
        let scanner_ref = &scanner;
        let mut scans = stream::iter(chapter_links)
            .map(move |chapter_url| async move {
                let scanned = scanner_ref.scan(&chapter_url).await;
                (chapter_url, scanned)
            })
            .buffer_unordered(self.config.chapter_workers.max(1));

        while let Some((chapter_id, scanned)) = scans.next().await {
            let found_terms = scanned?;
            let hit = found_terms.values().any(|found| *found);
            entry.results.push(ChapterRecord {
                chapter_id,
                found_terms,
            });
            if hit {
                // First positive in completion order ends the novel.
                info!(url = %source_url, "Confirmed hit; stopping remaining chapter scans");
                break;
            }
        }

        Ok(entry)
    }
}
