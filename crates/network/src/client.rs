// crates/network/src/client.rs
//! HTTP client wrapper

use crate::error::{NetworkError, NetworkResult};
use bytes::Bytes;
use reqwest::header::RANGE;
use reqwest::{Client as ReqwestClient, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("Tilawa/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
        }
    }
}

/// HTTP client, cheap to clone
#[derive(Clone)]
pub struct Client {
    inner: ReqwestClient,
    config: ClientConfig,
}

impl Client {
    /// Creates a new client with default configuration
    pub fn new() -> NetworkResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> NetworkResult<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(NetworkError::Http)?;

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs a GET request, failing on non-success status
    pub async fn get(&self, url: &str) -> NetworkResult<Response> {
        let url = parse_url(url)?;
        let response = self.inner.get(url).send().await?;
        check_status(response)
    }

    /// Performs a HEAD request, failing on non-success status
    pub async fn head(&self, url: &str) -> NetworkResult<Response> {
        let url = parse_url(url)?;
        let response = self.inner.head(url).send().await?;
        check_status(response)
    }

    /// Fetches and decodes a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> NetworkResult<T> {
        let response = self.get(url).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| NetworkError::InvalidResponse(e.to_string()))
    }

    /// Checks that a URL serves content without downloading it
    ///
    /// Uses HEAD; servers that reject HEAD are asked for the first byte instead.
    pub async fn check(&self, url: &str) -> NetworkResult<()> {
        match self.head(url).await {
            Ok(_) => Ok(()),
            Err(NetworkError::Status { status, .. })
                if status == StatusCode::METHOD_NOT_ALLOWED.as_u16()
                    || status == StatusCode::NOT_IMPLEMENTED.as_u16() =>
            {
                log::debug!("HEAD rejected for {}, retrying with ranged GET", url);
                let parsed = parse_url(url)?;
                let response = self
                    .inner
                    .get(parsed)
                    .header(RANGE, "bytes=0-0")
                    .send()
                    .await?;
                check_status(response).map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    /// Checks if a URL is accessible
    pub async fn is_accessible(&self, url: &str) -> bool {
        self.check(url).await.is_ok()
    }

    /// Downloads a whole response body into memory
    pub async fn download(&self, url: &str) -> NetworkResult<Bytes> {
        let response = self.get(url).await?;
        Ok(response.bytes().await?)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish()
    }
}

fn parse_url(url: &str) -> NetworkResult<Url> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(NetworkError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            url, other
        ))),
    }
}

fn check_status(response: Response) -> NetworkResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(NetworkError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }
}
