use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The underlying reader failed (including decompression failures of a
    /// wrapped decoder). Iteration stops after this error.
    #[display("failed to read control document")]
    Read,
    /// A line in the paragraph starting at `line` is neither a field nor a
    /// continuation. Only that paragraph is lost.
    #[display("malformed paragraph starting at line {line}")]
    Syntax { line: usize },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
