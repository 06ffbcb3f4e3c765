use crate::matcher::KeywordSet;
use serde::Deserialize;

/// Main configuration structure for Invoice-Scout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub summarizer: Option<SummarizerConfig>,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Looks up a site entry by its name
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.name == name)
    }
}

/// Crawler behavior configuration shared by every site
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Politeness delay awaited before each fetch (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Largest response body accepted (bytes)
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Maximum number of redirects followed per request
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Number of characters of page text kept as the content preview
    #[serde(rename = "content-preview-chars", default = "default_content_preview_chars")]
    pub content_preview_chars: usize,

    /// Number of characters of page text sent to the summarizer
    #[serde(rename = "summary-input-chars", default = "default_summary_input_chars")]
    pub summary_input_chars: usize,

    /// Upper bound on the queue when following links
    #[serde(rename = "max-queue-size", default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            content_preview_chars: default_content_preview_chars(),
            summary_input_chars: default_summary_input_chars(),
            max_queue_size: default_max_queue_size(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown export of matched pages
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// Chat-completions summarizer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Chat completions endpoint
    #[serde(rename = "api-url", default = "default_summarizer_api_url")]
    pub api_url: String,

    #[serde(default = "default_summarizer_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_summarizer_key_env")]
    pub api_key_env: String,

    #[serde(rename = "timeout-secs", default = "default_summarizer_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "max-tokens", default = "default_summarizer_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_summarizer_temperature")]
    pub temperature: f32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            api_url: default_summarizer_api_url(),
            model: default_summarizer_model(),
            api_key_env: default_summarizer_key_env(),
            timeout_secs: default_summarizer_timeout_secs(),
            max_tokens: default_summarizer_max_tokens(),
            temperature: default_summarizer_temperature(),
        }
    }
}

/// Webhook notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Webhook used when a site's stored settings carry none
    #[serde(rename = "webhook-url", default)]
    pub webhook_url: Option<String>,

    /// Matches per webhook message
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between two messages of the same run (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

/// One crawl target
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Unique key of the site; also the storage partition
    pub name: String,

    /// Human readable label used in notifications
    pub label: String,

    /// Only URLs starting with this prefix are crawled
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Sitemap index (or leaf sitemap) URL
    #[serde(rename = "sitemap-url")]
    pub sitemap_url: String,

    /// Crawled alone when sitemap discovery yields nothing
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    #[serde(rename = "keyword-set")]
    pub keyword_set: KeywordSet,

    /// Replaces the literal list of the keyword set when present
    #[serde(default)]
    pub keywords: Option<Vec<String>>,

    /// Replaces the pattern list of the keyword set when present
    #[serde(default)]
    pub patterns: Option<Vec<String>>,

    #[serde(default)]
    pub discovery: DiscoveryStrategy,

    #[serde(rename = "widget-rule", default)]
    pub widget_rules: Vec<WidgetRule>,
}

/// How the candidate queue is discovered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryStrategy {
    /// Sitemap URLs only
    #[default]
    Sitemap,
    /// Sitemap URLs, then in-scope links found on crawled pages
    SitemapAndLinks,
}

impl DiscoveryStrategy {
    pub fn follows_links(&self) -> bool {
        matches!(self, Self::SitemapAndLinks)
    }
}

/// Removes a "related applications" style widget: a heading whose text equals
/// one of the labels, together with the link block that follows it.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetRule {
    #[serde(rename = "heading-labels")]
    pub heading_labels: Vec<String>,

    #[serde(rename = "heading-selector", default = "default_heading_selector")]
    pub heading_selector: String,

    /// Minimum number of links the following block needs to be stripped
    #[serde(rename = "min-links", default = "default_min_links")]
    pub min_links: usize,
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_max_redirects() -> usize {
    5
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_content_preview_chars() -> usize {
    500
}

fn default_summary_input_chars() -> usize {
    2000
}

fn default_max_queue_size() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_summarizer_api_url() -> String {
    "https://api.mistral.ai/v1/chat/completions".to_string()
}

fn default_summarizer_model() -> String {
    "mistral-tiny".to_string()
}

fn default_summarizer_key_env() -> String {
    "MISTRAL_API_KEY".to_string()
}

fn default_summarizer_timeout_secs() -> u64 {
    30
}

fn default_summarizer_max_tokens() -> u32 {
    300
}

fn default_summarizer_temperature() -> f32 {
    0.3
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_heading_selector() -> String {
    "h1, h2, h3, h4, h5, h6".to_string()
}

fn default_min_links() -> usize {
    2
}
