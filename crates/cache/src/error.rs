//! Errors raised while fetching and caching index files.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Connection failure, reset or timeout while talking to the archive.
    #[display("network error fetching {_0}")]
    Network(#[error(not(source))] String),
    /// The archive answered with a non-success HTTP status.
    #[display("HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// The retry policy gave up; the last failure is attached.
    #[display("giving up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    /// A cached or freshly downloaded file does not decompress.
    #[display("corrupt cache file: {}", _0.display())]
    CorruptCache(#[error(not(source))] PathBuf),
    /// The cache key derived from a URL is unusable as a path.
    #[display("invalid cache key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// The HTTP client could not be constructed.
    #[display("failed to initialize HTTP client")]
    Client,
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Server errors and rate limiting are transient; any other status (404
    /// in particular) will not change by asking again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status(status) => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub(crate) fn map_io_error(e: IoError, path: &std::path::Path) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Network("http://example.org".into()), true)]
    #[case(ErrorKind::Status(500), true)]
    #[case(ErrorKind::Status(503), true)]
    #[case(ErrorKind::Status(429), true)]
    #[case(ErrorKind::Status(404), false)]
    #[case(ErrorKind::Status(403), false)]
    #[case(ErrorKind::CorruptCache(PathBuf::from("a/b.xz")), false)]
    #[case(ErrorKind::RetriesExhausted { attempts: 3 }, false)]
    fn retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }
}
