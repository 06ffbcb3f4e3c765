//! Page summaries
//!
//! Summaries are best-effort: every caller treats a `SummarizeError` as
//! "no summary" and carries on.

mod chat;

pub use chat::ChatSummarizer;

use crate::config::SummarizerConfig;
use crate::crawler::{normalize_whitespace, truncate_chars};
use crate::storage::{PersistenceGateway, StorageResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Length of an excerpt summary before the ellipsis
const EXCERPT_CHARS: usize = 200;

/// Errors from a summarization backend
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Summarizer request failed: {0}")]
    Http(String),

    #[error("Summarizer request timed out")]
    Timeout,

    #[error("Summarizer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Summarizer returned an unreadable response: {0}")]
    InvalidResponse(String),

    #[error("Summarizer returned an empty summary")]
    EmptyResponse,

    #[error("API key is not a valid header value")]
    InvalidApiKey,
}

impl From<reqwest::Error> for SummarizeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e.to_string())
        }
    }
}

/// Result type for summarization
pub type SummarizeResult<T> = Result<T, SummarizeError>;

/// A text summarization service
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes one page
    ///
    /// `content` is already cut to the configured input length.
    async fn summarize(&self, title: &str, content: &str, url: &str) -> SummarizeResult<String>;
}

/// Offline summarizer returning the start of the page text
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcerptSummarizer;

#[async_trait]
impl Summarizer for ExcerptSummarizer {
    async fn summarize(&self, _title: &str, content: &str, _url: &str) -> SummarizeResult<String> {
        Ok(excerpt(content))
    }
}

/// First 200 characters of the normalized text, with `...` when cut
pub fn excerpt(content: &str) -> String {
    let cleaned = normalize_whitespace(content);
    let head = truncate_chars(&cleaned, EXCERPT_CHARS);
    if head.len() < cleaned.len() {
        format!("{}...", head)
    } else {
        cleaned
    }
}

/// Builds the summarizer described by the config
///
/// # Returns
///
/// * `Ok(None)` - No `[summarizer]` section, or it is disabled
/// * `Ok(Some(ExcerptSummarizer))` - Enabled but the API key variable is unset
/// * `Ok(Some(ChatSummarizer))` - Enabled with an API key
/// * `Err(SummarizeError)` - The HTTP client could not be built
pub fn build_summarizer(
    config: Option<&SummarizerConfig>,
) -> SummarizeResult<Option<Arc<dyn Summarizer>>> {
    let Some(config) = config.filter(|c| c.enabled) else {
        return Ok(None);
    };

    match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => {
            info!(model = %config.model, "Using chat summarizer");
            Ok(Some(Arc::new(ChatSummarizer::new(config, key.trim())?)))
        }
        _ => {
            warn!(
                env = %config.api_key_env,
                "Summarizer API key not set, falling back to text excerpts"
            );
            Ok(Some(Arc::new(ExcerptSummarizer)))
        }
    }
}

/// Outcome of a summary backfill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub updated: usize,
    pub failed: usize,
}

/// Regenerates the summary of every stored match of a site
///
/// Matches are processed one at a time with `delay` between requests.
/// Summarizer failures are counted; storage failures abort the backfill.
pub async fn backfill_summaries(
    gateway: &dyn PersistenceGateway,
    site: &str,
    summarizer: &dyn Summarizer,
    max_input_chars: usize,
    delay: Duration,
) -> StorageResult<BackfillReport> {
    let matches = gateway.match_pages(site).await?;
    let mut report = BackfillReport::default();

    info!(site = %site, pages = matches.len(), "Backfilling summaries");

    for (index, page) in matches.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let input = truncate_chars(&page.content, max_input_chars);
        match summarizer.summarize(&page.title, input, &page.url).await {
            Ok(summary) => {
                gateway.update_summary(site, &page.url, &summary).await?;
                report.updated += 1;
            }
            Err(e) => {
                warn!(site = %site, url = %page.url, error = %e, "Summary backfill failed");
                report.failed += 1;
            }
        }
    }

    info!(
        site = %site,
        updated = report.updated,
        failed = report.failed,
        "Summary backfill finished"
    );
    Ok(report)
}
