//! Run coordination: remaining-work computation, bounded fan-out over
//! novels, checkpointing, and report generation.
//!
//! The orchestrator is the only writer of the checkpoint file. Each
//! novel is checkpointed as soon as it completes, so a crash loses at
//! most the novels that were still in flight. A fatal error from any
//! worker triggers one best-effort save of the accumulated snapshot and
//! then propagates: already-checkpointed work survives, uncommitted
//! in-flight work is discarded. An operator cancel signal (Ctrl-C)
//! takes the same save-then-abort path.

use std::future::Future;
use std::pin::pin;

use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{error, info, instrument, warn};

use crate::config::RunConfig;
use crate::error::FatalError;
use crate::gateways::classifier::Classify;
use crate::gateways::page::FetchPage;
use crate::processor::SourceProcessor;
use crate::progress::ProgressStore;
use crate::outputs::report;

/// Counters reported after a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Novels processed this run.
    pub processed: usize,
    /// Novels skipped because the checkpoint already recorded them.
    pub skipped: usize,
    /// Chapters with at least one confirmed term, across all runs.
    pub matched_chapters: usize,
}

/// Drives a whole run over the source list.
pub struct Orchestrator<'a, P, C> {
    pages: &'a P,
    classifier: &'a C,
    config: &'a RunConfig,
    store: &'a ProgressStore,
}

impl<'a, P, C> Orchestrator<'a, P, C>
where
    P: FetchPage,
    C: Classify,
{
    pub fn new(
        pages: &'a P,
        classifier: &'a C,
        config: &'a RunConfig,
        store: &'a ProgressStore,
    ) -> Self {
        Self {
            pages,
            classifier,
            config,
            store,
        }
    }

    /// Process every not-yet-visited source, then write the report.
    /// Aborts (after saving the checkpoint) when Ctrl-C arrives.
    pub async fn run(
        &self,
        sources: &[String],
        report_path: &str,
    ) -> Result<RunSummary, FatalError> {
        self.run_until(sources, report_path, cancel_signal()).await
    }

    /// [`run`](Self::run) with an explicit cancel future, so shutdown
    /// behavior is testable without delivering a real signal.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn run_until(
        &self,
        sources: &[String],
        report_path: &str,
        cancel: impl Future<Output = ()>,
    ) -> Result<RunSummary, FatalError> {
        let mut snapshot = self.store.load().await?;
        let visited = snapshot.visited();

        // Visited means skipped, even when the recorded result set is empty.
        let remaining: Vec<String> = sources
            .iter()
            .unique()
            .filter(|source| !visited.contains(*source))
            .cloned()
            .collect();
        let skipped = sources.iter().unique().count() - remaining.len();
        info!(
            remaining = remaining.len(),
            skipped,
            checkpointed = snapshot.len(),
            "Computed remaining work"
        );

        let processor = SourceProcessor::new(self.pages, self.classifier, self.config);
        let processor_ref = &processor;
        let mut completions = stream::iter(remaining)
            .map(move |source_url| async move { processor_ref.process(&source_url).await })
            .buffer_unordered(self.config.source_workers.max(1));

        let mut cancel = pin!(cancel);
        let mut processed = 0usize;
        loop {
            let completed = tokio::select! {
                biased;
                _ = &mut cancel => {
                    warn!("Cancel signal received; saving checkpoint and aborting");
                    if let Err(save_err) = self.store.save(&snapshot).await {
                        error!(error = %save_err, "Best-effort checkpoint save also failed");
                    }
                    return Err(FatalError::Interrupted);
                }
                completed = completions.next() => match completed {
                    Some(completed) => completed,
                    None => break,
                },
            };
            match completed {
                Ok(entry) => {
                    info!(
                        source_id = %entry.source_id,
                        chapters = entry.results.len(),
                        hit = entry.results.iter().any(|r| r.any_found()),
                        "Source completed"
                    );
                    snapshot.append(entry);
                    self.store.save(&snapshot).await?;
                    processed += 1;
                }
                Err(fatal) => {
                    error!(error = %fatal, "Fatal condition; saving checkpoint and aborting");
                    if let Err(save_err) = self.store.save(&snapshot).await {
                        error!(error = %save_err, "Best-effort checkpoint save also failed");
                    }
                    return Err(fatal);
                }
            }
        }
        drop(completions);

        let entries = report::filtered_entries(&snapshot);
        report::write_report(&entries, report_path).await?;

        Ok(RunSummary {
            processed,
            skipped,
            matched_chapters: entries.len(),
        })
    }
}

/// Resolves when the operator presses Ctrl-C.
async fn cancel_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handling on this platform; never cancel.
        std::future::pending::<()>().await;
    }
}
