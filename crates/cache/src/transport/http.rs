use crate::Transport;
use crate::error::{ErrorKind, Result};
use debsnap_config::HttpConfig;
use exn::ResultExt;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::io::Write;

/// [`Transport`] over a blocking `reqwest` client.
///
/// Every request carries the configured (browser-like) `User-Agent`.
/// Connecting and the request as a whole have separate timeouts; either one
/// expiring surfaces as a retryable network error instead of hanging a
/// worker.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent).or_raise(|| ErrorKind::Client)?;
        headers.insert(USER_AGENT, agent);
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        tracing::debug!(url, "GET");
        let mut response = self.client.get(url).send().or_raise(|| ErrorKind::Network(url.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        response.copy_to(sink).or_raise(|| ErrorKind::Network(url.to_string()))
    }
}
