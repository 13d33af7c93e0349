//! Compression errors.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The stream is truncated or fails its checksum. Fetching the same bytes
    /// again won't help; fetching the file again might.
    #[display("invalid or corrupted data")]
    InvalidData,
    /// Writing encoder output failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}
