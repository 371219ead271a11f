//! Final filtered report: the chapters worth reading.
//!
//! The report is derived in full from the checkpoint at the end of a
//! completed run; it is a read-only view, never incrementally
//! maintained. Each row is a chapter with at least one confirmed term,
//! flattened to `(source_id, chapter_id, true terms only)`.

use chrono::Utc;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::FatalError;
use crate::models::{ProgressSnapshot, ReportEntry};

/// Flatten the snapshot into report rows, keeping only confirmed terms.
pub fn filtered_entries(snapshot: &ProgressSnapshot) -> Vec<ReportEntry> {
    let mut entries = Vec::new();
    for source in &snapshot.sources {
        for chapter in &source.results {
            let found_terms: std::collections::BTreeMap<String, bool> = chapter
                .found_terms
                .iter()
                .filter(|(_, found)| **found)
                .map(|(term, found)| (term.clone(), *found))
                .collect();
            if found_terms.is_empty() {
                continue;
            }
            entries.push(ReportEntry {
                source_id: source.source_id.clone(),
                chapter_id: chapter.chapter_id.clone(),
                found_terms,
            });
        }
    }
    entries
}

/// Write the report rows as a pretty-printed JSON array.
#[instrument(level = "info", skip(entries))]
pub async fn write_report(entries: &[ReportEntry], path: &str) -> Result<(), FatalError> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| FatalError::Io(std::io::Error::other(e)))?;
    fs::write(path, json).await?;
    info!(
        path,
        entries = entries.len(),
        generated_at = %Utc::now().to_rfc3339(),
        "Wrote filtered report"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChapterRecord, SourceEntry};
    use std::collections::BTreeMap;

    fn record(chapter_id: &str, terms: &[(&str, bool)]) -> ChapterRecord {
        ChapterRecord {
            chapter_id: chapter_id.to_string(),
            found_terms: terms.iter().map(|(t, v)| (t.to_string(), *v)).collect(),
        }
    }

    fn entry(source_id: &str, results: Vec<ChapterRecord>) -> SourceEntry {
        SourceEntry {
            source_id: source_id.to_string(),
            title: None,
            categories: vec![],
            tags: vec![],
            results,
        }
    }

    #[test]
    fn test_only_positive_chapters_survive() {
        let snapshot = ProgressSnapshot {
            sources: vec![
                entry(
                    "https://example.com/novel/a",
                    vec![
                        record("a/1", &[("x", false), ("y", false)]),
                        record("a/2", &[("x", true), ("y", false)]),
                    ],
                ),
                entry(
                    "https://example.com/novel/b",
                    vec![record("b/1", &[("x", false)])],
                ),
                entry("https://example.com/novel/c", vec![]),
            ],
        };

        let entries = filtered_entries(&snapshot);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_id, "https://example.com/novel/a");
        assert_eq!(entries[0].chapter_id, "a/2");
    }

    #[test]
    fn test_false_terms_are_dropped_from_rows() {
        let snapshot = ProgressSnapshot {
            sources: vec![entry(
                "https://example.com/novel/a",
                vec![record("a/1", &[("x", true), ("y", false)])],
            )],
        };

        let entries = filtered_entries(&snapshot);
        let mut expected = BTreeMap::new();
        expected.insert("x".to_string(), true);
        assert_eq!(entries[0].found_terms, expected);
    }

    #[tokio::test]
    async fn test_write_report_produces_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final.json");

        let entries = vec![ReportEntry {
            source_id: "https://example.com/novel/a".to_string(),
            chapter_id: "a/2".to_string(),
            found_terms: std::iter::once(("x".to_string(), true)).collect(),
        }];
        write_report(&entries, path.to_str().unwrap()).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let back: Vec<ReportEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, entries);
    }
}
