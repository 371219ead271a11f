//! Command-line interface definitions.
//!
//! All paths can be supplied as flags or environment variables; only
//! the run configuration file has no default because it names the crawl
//! origin and the search terms.

use clap::Parser;

/// Command-line arguments for the novel term scanner.
///
/// # Examples
///
/// ```sh
/// novel_term_scan -c scan.yaml -s novel_links.txt
/// novel_term_scan -c scan.yaml -s novel_links.txt -p results.json -r final.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML run configuration
    #[arg(short, long, env = "SCAN_CONFIG")]
    pub config: String,

    /// Path to the newline-delimited list of novel URLs
    #[arg(short, long, env = "SCAN_SOURCE_LIST")]
    pub source_list: String,

    /// Path of the durable progress checkpoint
    #[arg(short, long, env = "SCAN_PROGRESS_FILE", default_value = "results.json")]
    pub progress_file: String,

    /// Path of the final filtered report
    #[arg(short, long, env = "SCAN_REPORT_FILE", default_value = "final.json")]
    pub report_file: String,
}
