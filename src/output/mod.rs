//! Output module for reports on stored crawl results
//!
//! This module handles:
//! - Loading a per-site report (counts, run history, matches) from storage
//! - Printing statistics to the terminal
//! - Exporting the stored matches as a markdown document

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{format_statistics, print_statistics};

use crate::storage::{GatewayStats, PersistenceGateway, RunRecord, StorageError, StorageResult, StoredMatch};
use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything stored about one site
#[derive(Debug, Clone)]
pub struct SiteReport {
    pub site: String,
    pub label: String,
    pub stats: GatewayStats,

    /// Newest first
    pub recent_runs: Vec<RunRecord>,

    pub matches: Vec<StoredMatch>,
}

/// Loads the report of one site
///
/// # Arguments
///
/// * `gateway` - The storage backend
/// * `site` - Site name
/// * `label` - Display label
/// * `run_limit` - Number of recent runs to include
pub async fn load_site_report(
    gateway: &dyn PersistenceGateway,
    site: &str,
    label: &str,
    run_limit: usize,
) -> StorageResult<SiteReport> {
    Ok(SiteReport {
        site: site.to_string(),
        label: label.to_string(),
        stats: gateway.stats(site).await?,
        recent_runs: gateway.recent_runs(site, run_limit).await?,
        matches: gateway.match_pages(site).await?,
    })
}
