//! Match notifications
//!
//! New matches of a run are delivered to a chat webhook as numbered markdown
//! lists, in batches.

mod webhook;

pub use webhook::WebhookNotifier;

use crate::storage::{PageRecord, PersistenceGateway, StoredMatch};
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Errors from a notification sink
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(String),

    #[error("Webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No webhook configured for site '{0}'")]
    NoWebhook(String),

    #[error("No matches stored for site '{0}'")]
    NothingToSend(String),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Result type for notification operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// One match as it appears in a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchNotice {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub matched_keyword: Option<String>,
}

impl From<&PageRecord> for MatchNotice {
    fn from(page: &PageRecord) -> Self {
        Self {
            title: page.title.clone(),
            url: page.url.clone(),
            summary: page.summary.clone(),
            matched_keyword: page.matched_keyword.clone(),
        }
    }
}

impl From<StoredMatch> for MatchNotice {
    fn from(page: StoredMatch) -> Self {
        Self {
            title: page.title,
            url: page.url,
            summary: page.summary,
            matched_keyword: page.matched_keyword,
        }
    }
}

/// A sink for newly discovered matches
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `matches` to `webhook_url`
    ///
    /// An empty slice sends nothing. Failures are not retried.
    async fn notify(
        &self,
        webhook_url: &str,
        matches: &[MatchNotice],
        site_label: &str,
    ) -> NotifyResult<()>;
}

/// Renders the message texts for a list of matches
///
/// Entries are numbered across batches. When more than one message is needed
/// every header carries a `(Part X/Y)` suffix.
///
/// # Example
///
/// ```
/// use invoice_scout::notify::{render_batches, MatchNotice};
///
/// let notice = MatchNotice {
///     title: "E-Invoicing".to_string(),
///     url: "https://mof.gov.ae/e-invoicing".to_string(),
///     summary: None,
///     matched_keyword: Some("e-invoicing".to_string()),
/// };
/// let messages = render_batches(&[notice], 10, "UAE");
/// assert_eq!(messages.len(), 1);
/// assert!(messages[0].starts_with("🧾 *New E-Invoicing Pages Found - UAE*\n\n1. "));
/// ```
pub fn render_batches(matches: &[MatchNotice], batch_size: usize, site_label: &str) -> Vec<String> {
    let batch_size = batch_size.max(1);
    let total = matches.len().div_ceil(batch_size);

    matches
        .chunks(batch_size)
        .enumerate()
        .map(|(batch_index, batch)| {
            let first_number = batch_index * batch_size + 1;
            let lines = batch
                .iter()
                .enumerate()
                .map(|(i, notice)| render_line(first_number + i, notice))
                .collect::<Vec<_>>()
                .join("\n");

            let part = if total > 1 {
                format!(" (Part {}/{})", batch_index + 1, total)
            } else {
                String::new()
            };

            format!(
                "🧾 *New E-Invoicing Pages Found - {}*{}\n\n{}",
                site_label, part, lines
            )
        })
        .collect()
}

fn render_line(number: usize, notice: &MatchNotice) -> String {
    let keyword = notice
        .matched_keyword
        .as_ref()
        .map(|k| format!("\n   🔑 Keyword: {}", k))
        .unwrap_or_default();
    let summary = notice
        .summary
        .as_ref()
        .map(|s| format!("\n   📝 {}\n", s))
        .unwrap_or_else(|| "\n".to_string());

    format!(
        "{}. **[{}]({})**{}{}",
        number, notice.title, notice.url, keyword, summary
    )
}

/// Sends every stored match of a site
///
/// # Returns
///
/// * `Ok(count)` - Number of matches delivered
/// * `Err(NotifyError::NoWebhook)` - No webhook in settings or config
/// * `Err(NotifyError::NothingToSend)` - The site has no stored matches
pub async fn resend_all(
    gateway: &dyn PersistenceGateway,
    notifier: &dyn Notifier,
    site: &str,
    site_label: &str,
    default_webhook: Option<&str>,
) -> NotifyResult<usize> {
    let settings = gateway.settings(site).await?;
    let webhook = settings
        .webhook_url
        .or_else(|| default_webhook.map(str::to_string))
        .filter(|w| !w.is_empty())
        .ok_or_else(|| NotifyError::NoWebhook(site.to_string()))?;

    let notices: Vec<MatchNotice> = gateway
        .match_pages(site)
        .await?
        .into_iter()
        .map(MatchNotice::from)
        .collect();
    if notices.is_empty() {
        return Err(NotifyError::NothingToSend(site.to_string()));
    }

    notifier.notify(&webhook, &notices, site_label).await?;
    info!(site = %site, count = notices.len(), "Resent stored matches");
    Ok(notices.len())
}
