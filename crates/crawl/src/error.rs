use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A listing page could not be downloaded; the transport error is attached.
    #[display("failed to fetch listing {_0}")]
    Fetch(#[error(not(source))] String),
    /// The requested date range is empty.
    #[display("invalid date range: {since} is after {until}")]
    InvalidRange { since: String, until: String },
    /// An index URL template failed to compile or render.
    #[display("invalid index URL template")]
    Template,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Fetches have already been through the retry policy by the time
        // they surface here.
        false
    }
}
