//! Storage module for persisting crawl results
//!
//! This module handles all durable state of the scout, including:
//! - SQLite database initialization and schema management
//! - The page cache and the match table
//! - Run history
//! - Per-site settings (auto-run flag, webhook, last-run timestamps)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteGateway;
pub use traits::{PersistenceGateway, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;

/// Opens (or creates) the gateway database at `path`
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteGateway)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to open the database or create the schema
pub fn open_gateway(path: &Path) -> StorageResult<SqliteGateway> {
    SqliteGateway::open(path)
}

/// Result of classifying one fetched URL
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    /// Bounded-length prefix of the extracted text
    pub content_preview: String,
    pub scraped_at: DateTime<Utc>,
    pub is_match: bool,
    pub matched_keyword: Option<String>,
    pub summary: Option<String>,
}

/// Outcome of a page upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// No record of the URL existed before the write
    pub is_new: bool,
}

/// What started a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Manual,
    Auto,
}

impl RunMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Record emitted once per run on finalize
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub mode: RunMode,
    /// Terminal status of the run
    pub status: crate::state::SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_pages_crawled: u64,
    pub new_match_count: u64,
}

/// A run read back from history
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub summary: RunSummary,
}

/// A stored match
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMatch {
    pub url: String,
    pub title: String,
    pub content: String,
    pub scraped_at: DateTime<Utc>,
    pub summary: Option<String>,
    pub matched_keyword: Option<String>,
}

/// Per-site settings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteSettings {
    pub auto_run_enabled: bool,
    pub webhook_url: Option<String>,
    pub last_auto_run_at: Option<DateTime<Utc>>,
    pub last_manual_run_at: Option<DateTime<Utc>>,
}

/// Partial settings update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub auto_run_enabled: Option<bool>,
    /// `Some(None)` clears the webhook
    pub webhook_url: Option<Option<String>>,
}

/// Aggregate counts for one site
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GatewayStats {
    pub total_pages: u64,
    pub match_pages: u64,
    /// Most recent of the last manual and last auto run
    pub last_run_at: Option<DateTime<Utc>>,
}
