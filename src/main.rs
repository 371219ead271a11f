//! # Novel Term Scan
//!
//! A resumable crawl-and-classify pipeline: given a list of web-novel
//! URLs, inspect the first few chapters of each, look for configured
//! terms in the chapter text, and confirm lexical hits with an LLM
//! before recording them.
//!
//! ## Usage
//!
//! ```sh
//! novel_term_scan -c scan.yaml -s novel_links.txt
//! ```
//!
//! ## Architecture
//!
//! The pipeline has two bounded concurrency tiers, novels in flight
//! and chapter scans within each novel, funneled through two
//! rate-gated gateways (the crawl origin and the LLM provider). Every
//! completed novel is appended to an atomically-written checkpoint, so
//! a crashed or aborted run resumes where it left off: recorded novels
//! are never re-fetched. A completed run ends by deriving the filtered
//! report of chapters with confirmed terms.
//!
//! Unrecoverable conditions (origin down, LLM quota exhausted, corrupt
//! checkpoint, operator interrupt) save the current checkpoint and
//! abort with a non-zero exit; per-page misses are absorbed as empty
//! results.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod gateways;
mod models;
mod orchestrator;
mod outputs;
mod processor;
mod progress;
mod scanner;
#[cfg(test)]
mod testing;

use cli::Cli;
use error::FatalError;
use gateways::classifier::ClassifierGateway;
use gateways::page::PageGateway;
use orchestrator::Orchestrator;
use progress::ProgressStore;

#[tokio::main]
async fn main() -> Result<(), FatalError> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("novel_term_scan starting up");

    let args = Cli::parse();
    let config = config::load_config(&args.config).await.map_err(startup_failure)?;
    if config.terms.is_empty() {
        error!("Configuration lists no search terms; nothing to scan for");
        return Err(FatalError::Config("no search terms configured".to_string()));
    }

    let sources = config::load_source_list(&args.source_list)
        .await
        .map_err(startup_failure)?;
    let pages = PageGateway::new(&config).map_err(startup_failure)?;
    let classifier = ClassifierGateway::new(&config).map_err(startup_failure)?;
    let store = ProgressStore::new(&args.progress_file);

    let orchestrator = Orchestrator::new(&pages, &classifier, &config, &store);
    let summary = match orchestrator.run(&sources, &args.report_file).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(
                error = %e,
                checkpoint = %args.progress_file,
                "Fatal condition ended the run; completed work is checkpointed"
            );
            return Err(e);
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        matched_chapters = summary.matched_chapters,
        report = %args.report_file,
        ?elapsed,
        "Scan complete"
    );
    Ok(())
}

fn startup_failure(e: FatalError) -> FatalError {
    error!(error = %e, "Startup failed");
    e
}
