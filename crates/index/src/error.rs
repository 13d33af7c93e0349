use derive_more::{Display, Error};
use std::path::PathBuf;

/// An index processing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The cached file failed to decompress part-way through. Purge it from
    /// the cache and fetch it again.
    #[display("corrupt index file: {}", _0.display())]
    CorruptCache(#[error(not(source))] PathBuf),
    /// A paragraph of the index could not be parsed. Only that stanza is lost.
    #[display("malformed stanza starting at line {line}")]
    Syntax { line: usize },
    /// A configured checksum pattern does not compile, or does not have
    /// exactly one capture group.
    #[display("invalid checksum pattern for field '{field}': {pattern}")]
    InvalidPattern { field: String, pattern: String },
    /// The cached file could not be opened.
    #[display("failed to open index file: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Corruption is recoverable, but only by refetching, which is the
        // caller's business.
        false
    }
}
