//! Crawler module for site-target crawl runs
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded timeouts, redirects and body sizes
//! - HTML content extraction and cleanup
//! - The FIFO crawl queue
//! - Site profiles and the per-site crawl engine
//! - The scheduled (auto-run) trigger

mod engine;
mod fetcher;
mod parser;
mod profile;
mod queue;

pub use engine::{CrawlEngine, RunOptions};
pub use fetcher::{build_http_client, fetch_text, FetchError, FetchedPage};
pub use parser::{extract_content, normalize_whitespace, truncate_chars, ContentRules, PageContent};
pub use profile::SiteProfile;
pub use queue::{filter_known, UrlQueue};
pub use crate::storage::RunMode;

use crate::{Result, ScoutError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Why a scheduled trigger did not start a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AutoRunDisabled,
    AlreadyRunning,
}

/// Outcome of a scheduled trigger
#[derive(Debug)]
pub enum TriggerOutcome {
    /// An auto run was started; the handle resolves when it is finalized
    Started(JoinHandle<()>),
    Skipped(SkipReason),
}

/// Starts an "only new" auto run if the site allows it
///
/// This is what a recurring external trigger (cron, systemd timer) calls.
///
/// # Returns
///
/// * `Ok(TriggerOutcome::Started)` - Auto-run enabled and the engine was idle
/// * `Ok(TriggerOutcome::Skipped)` - Auto-run disabled or a run is active
/// * `Err(ScoutError)` - Settings could not be read
pub async fn trigger_scheduled(engine: &Arc<CrawlEngine>) -> Result<TriggerOutcome> {
    let settings = engine.gateway().settings(engine.site()).await?;
    if !settings.auto_run_enabled {
        debug!(site = %engine.site(), "Auto-run disabled, skipping scheduled trigger");
        return Ok(TriggerOutcome::Skipped(SkipReason::AutoRunDisabled));
    }

    match engine.start(RunOptions::auto()) {
        Ok(handle) => {
            info!(site = %engine.site(), "Scheduled run started");
            Ok(TriggerOutcome::Started(handle))
        }
        Err(ScoutError::Busy { .. }) => {
            info!(site = %engine.site(), "Run already in progress, skipping scheduled trigger");
            Ok(TriggerOutcome::Skipped(SkipReason::AlreadyRunning))
        }
        Err(e) => Err(e),
    }
}
