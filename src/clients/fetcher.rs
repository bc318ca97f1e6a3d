//! HTTP fetch abstraction for retrieving remote resources.
//!
//! The `Fetcher` trait decouples the pipeline from the concrete HTTP client
//! so tests can substitute deterministic fakes without network access.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// A fully buffered remote resource.
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    /// HTTP status code of the response.
    pub status: u16,
    /// Response body, buffered in memory.
    pub body: Bytes,
}

impl FetchedPayload {
    /// Whether the status is in the HTTP success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for fetching a URL into memory.
///
/// A single attempt is definitive: implementations must not retry. Transport
/// failures (DNS, refused connection, broken transfer) surface as `Err`;
/// non-success statuses are returned in the payload for the caller to judge.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPayload>;
}

/// Production fetcher backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPayload> {
        tracing::debug!(url = %url, "fetching remote resource");

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::debug!(
            url = %url,
            status = status,
            body_len = body.len(),
            "fetch completed"
        );

        Ok(FetchedPayload { status, body })
    }
}
