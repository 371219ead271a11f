//! Data models for the crawl-and-classify pipeline.
//!
//! This module defines the durable data structures:
//! - [`ChapterRecord`]: the per-chapter term verdicts
//! - [`SourceEntry`]: one crawled novel and its recorded chapters
//! - [`ProgressSnapshot`]: the full checkpoint, a JSON array of entries
//! - [`ReportEntry`]: one flattened row of the final filtered report
//!
//! Term maps are `BTreeMap` so the serialized term order is stable
//! across runs and identical input produces identical output.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Term verdicts for a single chapter page.
///
/// A term maps to `true` only when it occurred verbatim in the chapter
/// text *and* the classifier confirmed the page. Records are immutable
/// once written; a chapter that appears in the checkpoint is never
/// re-fetched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChapterRecord {
    /// The chapter page URL.
    pub chapter_id: String,
    /// Verdict per configured term.
    pub found_terms: BTreeMap<String, bool>,
}

impl ChapterRecord {
    /// Whether any term was confirmed for this chapter.
    pub fn any_found(&self) -> bool {
        self.found_terms.values().any(|found| *found)
    }
}

/// One crawled novel: its identifier, scraped metadata, and the chapter
/// records accumulated for it.
///
/// An entry in the checkpoint means the novel was *visited*, even when
/// `results` is empty (missing page, unrecognized layout). Visited
/// novels are never reprocessed on resume.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceEntry {
    /// The novel page URL.
    pub source_id: String,
    /// Novel title, when the page exposed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Category labels scraped from the novel page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    /// Tag labels scraped from the novel page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Chapter verdicts, in completion order.
    pub results: Vec<ChapterRecord>,
}

/// The durable checkpoint: every novel visited so far.
///
/// Serialized as a bare JSON array. Exactly one snapshot exists on disk
/// at a time and writes are atomic (see the `progress` module), so a
/// reader only ever observes a complete previous or complete next state.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProgressSnapshot {
    pub sources: Vec<SourceEntry>,
}

impl ProgressSnapshot {
    /// The set of source ids already recorded.
    ///
    /// Duplicate ids in a hand-edited checkpoint are tolerated (the set
    /// collapses them) but flagged, since appends never produce them.
    pub fn visited(&self) -> HashSet<String> {
        let mut seen = HashSet::with_capacity(self.sources.len());
        for entry in &self.sources {
            if !seen.insert(entry.source_id.clone()) {
                warn!(source_id = %entry.source_id, "duplicate source in checkpoint");
            }
        }
        seen
    }

    /// Append a completed source. The entry list is append-only across runs.
    pub fn append(&mut self, entry: SourceEntry) {
        self.sources.push(entry);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// One row of the final filtered report: a chapter with at least one
/// confirmed term, carrying only the terms that are `true`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportEntry {
    pub source_id: String,
    pub chapter_id: String,
    pub found_terms: BTreeMap<String, bool>,
}
