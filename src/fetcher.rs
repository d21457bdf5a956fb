//! Outbound requests against allow-listed third-party URLs
//!
//! One GET per call with the configured timeout. Non-2xx responses are
//! terminal; nothing is retried or cached. Dropping the returned future
//! (for example when the client disconnects) aborts the request.

use bytes::{Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("achievement-gateway/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Largest upstream body buffered for one fetch
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url {0}")]
    InvalidUrl(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} body exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Raw bytes of a fetched resource plus its upstream content type
#[derive(Debug, Clone)]
pub struct FetchedBinary {
    pub bytes: Bytes,
    /// `Content-Type` header as sent upstream, empty when absent
    pub content_type: String,
}

/// HTTP client for scrape targets
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl ContentFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Override the body ceiling
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Fetch a page as text; invalid UTF-8 is replaced
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        let body = self.read_body(url, response).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Fetch a binary resource
    pub async fn fetch_binary(&self, url: &str) -> Result<FetchedBinary, FetchError> {
        let response = self.get(url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = self.read_body(url, response).await?;
        Ok(FetchedBinary {
            bytes,
            content_type,
        })
    }

    async fn read_body(
        &self,
        url: &str,
        mut response: reqwest::Response,
    ) -> Result<Bytes, FetchError> {
        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        };

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let started = std::time::Instant::now();
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        debug!(
            url = url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream fetch"
        );

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}
