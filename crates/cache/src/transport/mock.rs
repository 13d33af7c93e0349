//! Scripted transport for tests.

use crate::Transport;
use crate::error::{ErrorKind, Result};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// One scripted answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// `200 OK` with this body.
    Body(Vec<u8>),
    /// A non-success HTTP status.
    Status(u16),
    /// The connection fails before any byte arrives.
    Disconnect,
    /// The connection drops after part of the body was sent.
    Truncated(Vec<u8>),
}

/// In-memory [`Transport`] serving a queue of responses per URL.
///
/// Responses are served in order; the last one repeats forever. Unknown URLs
/// answer `404`. Every request is counted, so tests can assert on network
/// usage (e.g. that a warm cache makes no requests at all).
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    requests: Mutex<HashMap<String, usize>>,
}

impl MockTransport {
    /// Serve `body` for every request to `url`.
    pub fn with_body(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.with_responses(url, [MockResponse::Body(body.into())])
    }

    /// Serve `responses` in order for requests to `url`.
    pub fn with_responses(self, url: impl Into<String>, responses: impl IntoIterator<Item = MockResponse>) -> Self {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).insert(url.into(), responses.into_iter().collect());
        self
    }

    /// Number of requests made to `url` so far.
    pub fn requests(&self, url: &str) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).get(url).copied().unwrap_or(0)
    }

    /// Number of requests made to any URL so far.
    pub fn total_requests(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).values().sum()
    }

    fn next_response(&self, url: &str) -> MockResponse {
        *self.requests.lock().unwrap_or_else(PoisonError::into_inner).entry(url.to_string()).or_default() += 1;
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(MockResponse::Status(404)),
            Some(queue) => queue.front().cloned().unwrap_or(MockResponse::Status(404)),
            None => MockResponse::Status(404),
        }
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        match self.next_response(url) {
            MockResponse::Body(body) => {
                sink.write_all(&body).map_err(ErrorKind::Io)?;
                Ok(body.len() as u64)
            },
            MockResponse::Status(status) => exn::bail!(ErrorKind::Status(status)),
            MockResponse::Disconnect => exn::bail!(ErrorKind::Network(url.to_string())),
            MockResponse::Truncated(partial) => {
                sink.write_all(&partial).map_err(ErrorKind::Io)?;
                exn::bail!(ErrorKind::Network(url.to_string()))
            },
        }
    }
}
