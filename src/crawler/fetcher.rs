//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client (user agent, timeout, redirect limit)
//! - GET requests with a bounded response body
//! - Error classification

use crate::config::CrawlerConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Per-request failures
///
/// None of these abort a run: the engine logs them and counts the page as
/// crawled without a match.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Too many redirects")]
    RedirectLimit,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_redirect() {
            Self::RedirectLimit
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A fetched document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    pub status_code: u16,
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use invoice_scout::config::CrawlerConfig;
/// use invoice_scout::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.request_timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns its body as text
///
/// # Request Flow
///
/// 1. GET the URL, following at most the client's redirect limit
/// 2. Reject non-2xx statuses
/// 3. Reject bodies whose declared or streamed length exceeds `max_body_bytes`
/// 4. Decode the body as UTF-8, replacing invalid sequences
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `max_body_bytes` - Largest body accepted
pub async fn fetch_text(
    client: &Client,
    url: &str,
    max_body_bytes: usize,
) -> Result<FetchedPage, FetchError> {
    let mut response = client.get(url).send().await?;
    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    if let Some(length) = response.content_length() {
        if length > max_body_bytes as u64 {
            return Err(FetchError::BodyTooLarge {
                limit: max_body_bytes,
            });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > max_body_bytes {
            return Err(FetchError::BodyTooLarge {
                limit: max_body_bytes,
            });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
