//! Storage traits and error types
//!
//! This module defines the persistence interface the crawl engine consumes
//! and the associated error types.

use crate::storage::{
    GatewayStats, PageRecord, RunRecord, RunSummary, SettingsUpdate, SiteSettings, StoredMatch,
    UpsertOutcome,
};
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable storage consumed by the crawl engine
///
/// Every operation is scoped to one site so several site-targets can share a
/// backend. Implementations must be safe to share between engines.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    // ===== Crawl pipeline =====

    /// Hashes of every URL previously stored for the site
    async fn known_url_hashes(&self, site: &str) -> StorageResult<HashSet<String>>;

    /// Writes a processed page
    ///
    /// The page always lands in the page cache; matches are also written to
    /// the match table. Idempotent per URL.
    ///
    /// # Returns
    ///
    /// `is_new` is true when no record of the URL existed before this call
    async fn upsert_page(&self, site: &str, page: &PageRecord) -> StorageResult<UpsertOutcome>;

    /// Appends a run to the history and stamps the matching last-run time
    async fn record_run_summary(&self, site: &str, summary: &RunSummary) -> StorageResult<()>;

    // ===== Settings =====

    async fn settings(&self, site: &str) -> StorageResult<SiteSettings>;

    async fn update_settings(&self, site: &str, update: SettingsUpdate)
        -> StorageResult<SiteSettings>;

    /// Deletes pages, matches and runs, keeping auto-run and webhook settings
    async fn clear_all(&self, site: &str) -> StorageResult<()>;

    // ===== Reads =====

    /// Stored matches, most recent first
    async fn match_pages(&self, site: &str) -> StorageResult<Vec<StoredMatch>>;

    async fn stats(&self, site: &str) -> StorageResult<GatewayStats>;

    /// Most recent runs first
    async fn recent_runs(&self, site: &str, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Maintenance =====

    /// Replaces the summary of a stored match
    async fn update_summary(&self, site: &str, url: &str, summary: &str) -> StorageResult<()>;

    /// Replaces the matched keyword of a stored match
    async fn update_matched_keyword(&self, site: &str, url: &str, keyword: &str)
        -> StorageResult<()>;

    /// Demotes a stored match to a plain cached page
    ///
    /// The page stays in the cache so only-new runs do not fetch it again.
    async fn remove_match(&self, site: &str, url: &str) -> StorageResult<()>;
}
