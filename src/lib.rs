//! Invoice-Scout: a sitemap-driven e-invoicing page watcher
//!
//! This crate crawls government websites from their sitemaps, classifies every
//! page against a multilingual keyword table, persists the results and notifies
//! a chat webhook about newly discovered matches.

pub mod config;
pub mod crawler;
pub mod matcher;
pub mod notify;
pub mod output;
pub mod sitemap;
pub mod state;
pub mod storage;
pub mod summarize;
pub mod url;

use thiserror::Error;

/// Main error type for Invoice-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("A crawl is already in progress for site '{site}'")]
    Busy { site: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Sitemap error: {0}")]
    Sitemap(#[from] sitemap::SitemapError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Summarizer error: {0}")]
    Summarize(#[from] summarize::SummarizeError),

    #[error("Notification error: {0}")]
    Notify(#[from] notify::NotifyError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown site: {0}")]
    UnknownSite(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Invoice-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, RunMode, RunOptions};
pub use matcher::{KeywordMatcher, MatchResult};
pub use state::{CrawlSession, SessionStatus};
pub use url::hash_url;
