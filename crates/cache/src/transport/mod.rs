//! Network transport seam.
//!
//! The cache store and the crawler only ever need "GET this URL and stream
//! the body somewhere", which is all [`Transport`] asks for. The real
//! implementation is [`HttpTransport`]; tests use `MockTransport` (behind the
//! `mock` feature), which serves scripted responses and counts requests.

mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::http::HttpTransport;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockResponse, MockTransport};
use crate::error::Result;
use std::io::Write;

/// Blocking HTTP GET.
///
/// Implementations must report connection problems as
/// [`Network`](crate::error::ErrorKind::Network) and non-success responses
/// as [`Status`](crate::error::ErrorKind::Status), so that callers can tell
/// transient failures from permanent ones.
pub trait Transport: Send + Sync {
    /// Stream the body of `url` into `sink`, returning the number of bytes
    /// written. On error, `sink` may have received a partial body.
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;

    /// Convenience wrapper collecting the whole body in memory. Only meant
    /// for small documents such as directory listings.
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        self.get(url, &mut body)?;
        Ok(body)
    }
}
