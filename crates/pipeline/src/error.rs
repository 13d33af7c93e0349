//! Pipeline Error Types

use debsnap_cache::Timestamp;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configured packages are absent from the first snapshot processed;
    /// the package list or the date range is probably wrong.
    #[display("packages missing from the first snapshot: {}", missing.join(", "))]
    SanityCheck {
        #[error(not(source))]
        missing: Vec<String>,
    },
    /// One snapshot could not be processed. The run skips it.
    #[display("failed to process snapshot {_0}")]
    Snapshot(#[error(not(source))] Timestamp),
    /// Output could not be written.
    #[display("failed to write {}", _0.display())]
    Persistence(#[error(not(source))] PathBuf),
    /// A worker thread panicked.
    #[display("worker {_0} panicked")]
    Worker(#[error(not(source))] usize),
    /// The pipeline could not be assembled from the configuration.
    #[display("invalid pipeline configuration")]
    Config,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
