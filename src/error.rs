//! Error taxonomy for the scan pipeline.
//!
//! Only unrecoverable conditions live here. Outcomes that merely mean
//! "nothing to record" (a missing page, a classifier that declined to
//! evaluate) are modeled as values on the gateway return types, not as
//! errors, so they can be absorbed where they occur. A [`FatalError`]
//! always travels untouched up to `main`, which persists the current
//! checkpoint and exits non-zero.

use std::path::PathBuf;
use thiserror::Error;

/// Unrecoverable conditions that end the run.
#[derive(Debug, Error)]
pub enum FatalError {
    /// The origin server could not be reached or the request failed in
    /// transit. Treated as a stop condition rather than a retry condition
    /// so a systemic outage is never masked by partial output.
    #[error("transport failure fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The origin answered with an HTTP status that is neither success
    /// nor the tolerated 403/404 pair.
    #[error("origin returned HTTP {status} for {url}")]
    BadStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The classifier provider signalled quota or rate exhaustion.
    /// Continuing would compound the violation, so all classifier use
    /// stops for the run.
    #[error("classifier quota exhausted: {0}")]
    QuotaExceeded(String),

    /// The classifier call failed for a reason other than quota or
    /// content policy (transport error, unexpected response shape).
    #[error("classifier request failed: {0}")]
    Classifier(String),

    /// An existing checkpoint file could not be parsed. Startup-fatal:
    /// treating corruption as "no progress" would silently re-crawl.
    #[error("corrupt checkpoint at {path}: {source}")]
    CorruptCheckpoint {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The checkpoint could not be written or renamed into place.
    #[error("failed to persist checkpoint at {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source list contained a line that is not an absolute URL.
    #[error("malformed source list: line {line}: {reason}")]
    MalformedSourceList { line: usize, reason: String },

    /// An operator cancel signal arrived. Follows the same
    /// save-then-abort path as the other fatal conditions.
    #[error("interrupted by operator")]
    Interrupted,

    /// The configuration named something unusable (bad base URL,
    /// missing API key variable).
    #[error("configuration error: {0}")]
    Config(String),

    /// A configured CSS selector failed to parse.
    #[error("invalid {name} selector: {reason}")]
    BadSelector { name: String, reason: String },

    /// Filesystem failure outside the checkpoint path (report output,
    /// source list read).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
