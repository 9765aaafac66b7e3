use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::debug;

/// Status code and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text.
    pub body: String,
}

impl RawResponse {
    /// Convenience constructor.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Issues a single GET and reports what came back, without judging it.
pub trait Transport {
    /// Perform one request against `url`.
    fn get(&self, url: &str) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<RawResponse> {
        (**self).get(url)
    }
}

/// Blocking HTTP transport backed by `reqwest`.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client with the given user agent and request timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("failed to read body from {url}"))?;
        debug!(url, status, bytes = body.len(), "received response");
        Ok(RawResponse { status, body })
    }
}
