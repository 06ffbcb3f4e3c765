//! Crawl engine - run lifecycle and the per-page pipeline
//!
//! One engine exists per site-target. It owns the observable session, the
//! in-run visited set and the in-run match lists, and drives one run at a
//! time through:
//!
//! 1. Candidate discovery (seeds, or the sitemap with a seed fallback)
//! 2. Optional "only new" filtering against the gateway's known URL hashes
//! 3. The FIFO loop: dedup, throttle, fetch, extract, classify, summarize, persist
//! 4. Finalization: session status, run summary, webhook notification

use crate::config::CrawlerConfig;
use crate::crawler::queue::{filter_known, UrlQueue};
use crate::crawler::{extract_content, fetch_text, truncate_chars, SiteProfile};
use crate::notify::{MatchNotice, Notifier};
use crate::sitemap::SitemapResolver;
use crate::state::{CrawlSession, SessionStatus, VisitedSet, VisitedStore};
use crate::storage::{PageRecord, PersistenceGateway, RunMode, RunSummary};
use crate::summarize::Summarizer;
use crate::url::clean_link;
use crate::{Result, ScoutError};
use chrono::Utc;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// Pages between two progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Options of a single run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// What started the run; recorded in the run history
    pub mode: RunMode,

    /// Skip every URL whose hash the gateway already knows
    pub only_new: bool,

    /// Crawl exactly these URLs, in order, instead of discovering the sitemap
    pub seed_urls: Vec<String>,
}

impl RunOptions {
    pub fn manual() -> Self {
        Self::default()
    }

    /// Options used by the scheduled trigger
    pub fn auto() -> Self {
        Self {
            mode: RunMode::Auto,
            only_new: true,
            seed_urls: Vec::new(),
        }
    }
}

/// Result of processing one dequeued URL
enum PageOutcome {
    Processed { is_match: bool, page_url: String, links: Vec<String> },
    Failed,
}

/// Clears the running flag when a run ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Crawl engine of one site-target
pub struct CrawlEngine {
    profile: SiteProfile,
    crawler: CrawlerConfig,
    client: Client,
    gateway: Arc<dyn PersistenceGateway>,
    summarizer: Option<Arc<dyn Summarizer>>,
    notifier: Option<Arc<dyn Notifier>>,

    /// Used when the site's stored settings carry no webhook
    default_webhook: Option<String>,

    /// Set for the whole lifetime of a run, finalization included
    running: AtomicBool,

    /// Cooperative stop request, checked between iterations
    stop_requested: AtomicBool,

    session: Mutex<CrawlSession>,
    visited: Mutex<VisitedSet>,

    /// Every match of the current run
    matches: Mutex<Vec<PageRecord>>,

    /// Matches of the current run that were unknown before it
    new_matches: Mutex<Vec<MatchNotice>>,
}

impl CrawlEngine {
    /// Creates an idle engine
    ///
    /// # Arguments
    ///
    /// * `profile` - The compiled site profile
    /// * `crawler` - Throttling and fetch limits
    /// * `client` - Shared HTTP client (see `build_http_client`)
    /// * `gateway` - Durable storage
    pub fn new(
        profile: SiteProfile,
        crawler: CrawlerConfig,
        client: Client,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            profile,
            crawler,
            client,
            gateway,
            summarizer: None,
            notifier: None,
            default_webhook: None,
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            session: Mutex::new(CrawlSession::new()),
            visited: Mutex::new(VisitedSet::default()),
            matches: Mutex::new(Vec::new()),
            new_matches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Enables end-of-run notifications
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>, default_webhook: Option<String>) -> Self {
        self.notifier = Some(notifier);
        self.default_webhook = default_webhook.filter(|w| !w.is_empty());
        self
    }

    /// Replaces the in-memory visited store
    pub fn with_visited_store(mut self, store: Box<dyn VisitedStore>) -> Self {
        self.visited = Mutex::new(VisitedSet::new(store));
        self
    }

    pub fn site(&self) -> &str {
        &self.profile.name
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Point-in-time copy of the session
    pub fn snapshot(&self) -> CrawlSession {
        self.session().clone()
    }

    /// Matches found so far in the current (or last) run
    pub fn matches(&self) -> Vec<PageRecord> {
        lock(&self.matches).clone()
    }

    /// Matches of the current (or last) run that no earlier run had stored
    pub fn new_matches(&self) -> Vec<MatchNotice> {
        lock(&self.new_matches).clone()
    }

    /// Starts a run in the background
    ///
    /// The session is already `scraping` when this returns.
    ///
    /// # Returns
    ///
    /// * `Ok(JoinHandle)` - Resolves once the run is finalized
    /// * `Err(ScoutError::Busy)` - A run is already active; nothing changed
    pub fn start(self: &Arc<Self>, options: RunOptions) -> Result<JoinHandle<()>> {
        self.acquire()?;
        self.prepare_run();

        let engine = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let _guard = RunningGuard(&engine.running);
            engine.execute(options).await;
        }))
    }

    /// Runs to completion on the current task
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - The finalized session (its status may be `error`)
    /// * `Err(ScoutError::Busy)` - A run is already active
    pub async fn run(&self, options: RunOptions) -> Result<CrawlSession> {
        self.acquire()?;
        self.prepare_run();

        let _guard = RunningGuard(&self.running);
        self.execute(options).await;
        Ok(self.snapshot())
    }

    /// Requests a cooperative stop
    ///
    /// The in-flight fetch completes; the loop exits before the next URL.
    ///
    /// # Returns
    ///
    /// `false` if no run is active
    pub fn stop(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.stop_requested.store(true, Ordering::SeqCst);
        info!(site = %self.profile.name, "Stop requested");
        true
    }

    fn acquire(&self) -> Result<()> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| ScoutError::Busy {
                site: self.profile.name.clone(),
            })
    }

    fn prepare_run(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
        lock(&self.visited).reset();
        lock(&self.matches).clear();
        lock(&self.new_matches).clear();
        self.session().begin(Utc::now());
    }

    fn session(&self) -> MutexGuard<'_, CrawlSession> {
        lock(&self.session)
    }

    fn should_stop(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Crawls and finalizes; never fails past this point
    async fn execute(&self, options: RunOptions) {
        let site = self.profile.name.as_str();
        let started_at = self.session().started_at.unwrap_or_else(Utc::now);
        info!(site = %site, mode = %options.mode, only_new = options.only_new, "Run started");

        let outcome = self.crawl(&options).await;

        let completed_at = Utc::now();
        let status = match outcome {
            Ok(status) => {
                self.session().finish(status, completed_at);
                status
            }
            Err(e) => {
                error!(site = %site, error = %e, "Run failed");
                self.session().fail(e.to_string(), completed_at);
                SessionStatus::Error
            }
        };

        let session = self.snapshot();
        let new_matches = self.new_matches();
        let summary = RunSummary {
            mode: options.mode,
            status,
            started_at,
            completed_at,
            total_pages_crawled: session.total_pages_crawled,
            new_match_count: new_matches.len() as u64,
        };

        if let Err(e) = self.gateway.record_run_summary(site, &summary).await {
            error!(site = %site, error = %e, "Failed to record run summary");
        }

        info!(
            site = %site,
            status = %status,
            pages = session.total_pages_crawled,
            found = session.e_invoicing_pages_found,
            duplicates = session.duplicates_ignored,
            new = new_matches.len(),
            "Run finished"
        );

        if status != SessionStatus::Error {
            self.notify(&new_matches).await;
        }
    }

    /// The crawl loop
    ///
    /// # Returns
    ///
    /// * `Ok(Completed)` - The queue drained
    /// * `Ok(Stopped)` - A stop request was observed
    /// * `Err(_)` - A gateway failure; per-URL errors never surface here
    async fn crawl(&self, options: &RunOptions) -> Result<SessionStatus> {
        let site = self.profile.name.as_str();

        let mut candidates = if options.seed_urls.is_empty() {
            self.discover().await
        } else {
            options.seed_urls.clone()
        };

        if options.only_new {
            let known = self.gateway.known_url_hashes(site).await?;
            let before = candidates.len();
            candidates = filter_known(candidates, &known);
            info!(
                site = %site,
                skipped = before - candidates.len(),
                remaining = candidates.len(),
                "Filtered previously seen URLs"
            );
        }

        let mut queue = UrlQueue::from_seeds(candidates, self.crawler.max_queue_size);
        info!(site = %site, queued = queue.len(), "Crawl queue ready");

        let delay = Duration::from_millis(self.crawler.request_delay_ms);

        loop {
            if self.should_stop() {
                info!(site = %site, remaining = queue.len(), "Run stopped");
                return Ok(SessionStatus::Stopped);
            }

            let Some(url) = queue.pop() else {
                return Ok(SessionStatus::Completed);
            };

            let first_visit = lock(&self.visited).mark(&url);
            if !first_visit {
                debug!(site = %site, url = %url, "Already visited in this run");
                self.session().record_duplicate(&url);
                continue;
            }

            self.session().set_current_url(url.as_str());

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let is_match = match self.process_page(&url).await? {
                PageOutcome::Processed {
                    is_match,
                    page_url,
                    links,
                } => {
                    if self.profile.discovery.follows_links() {
                        self.enqueue_links(&mut queue, &page_url, &links);
                    }
                    is_match
                }
                PageOutcome::Failed => false,
            };

            let crawled = {
                let mut session = self.session();
                session.record_page(&url, is_match);
                session.total_pages_crawled
            };

            if crawled % PROGRESS_INTERVAL == 0 {
                let session = self.snapshot();
                info!(
                    site = %site,
                    crawled,
                    found = session.e_invoicing_pages_found,
                    duplicates = session.duplicates_ignored,
                    remaining = queue.len(),
                    "Crawl progress"
                );
            }
        }
    }

    /// Builds the candidate list from the sitemap, falling back to the seed URL
    async fn discover(&self) -> Vec<String> {
        let resolver = SitemapResolver::new(
            self.client.clone(),
            Duration::from_millis(self.crawler.request_delay_ms),
            self.crawler.max_body_bytes,
        );

        let urls = resolver
            .discover(
                &self.profile.sitemap_url,
                &self.profile.base_url,
                &self.stop_requested,
                |status| self.session().set_current_url(status),
            )
            .await;

        if urls.is_empty() {
            warn!(
                site = %self.profile.name,
                seed = %self.profile.seed_url,
                "Sitemap yielded no URLs, falling back to the seed URL"
            );
            return vec![self.profile.seed_url.clone()];
        }

        info!(site = %self.profile.name, urls = urls.len(), "Sitemap discovery finished");
        urls
    }

    /// Fetches, classifies and persists one URL
    async fn process_page(&self, url: &str) -> Result<PageOutcome> {
        let site = self.profile.name.as_str();

        let fetched = match fetch_text(&self.client, url, self.crawler.max_body_bytes).await {
            Ok(page) => page,
            Err(e) => {
                warn!(site = %site, url = %url, error = %e, "Failed to fetch page");
                return Ok(PageOutcome::Failed);
            }
        };

        let content = extract_content(&fetched.body, &self.profile.content_rules);
        let result = self
            .profile
            .matcher
            .match_page(&content.text, &content.title, url);

        let summary = if result.is_match {
            self.summarize(&content.title, &content.text, url).await
        } else {
            None
        };

        let record = PageRecord {
            url: url.to_string(),
            title: content.title,
            content_preview: truncate_chars(&content.text, self.crawler.content_preview_chars)
                .to_string(),
            scraped_at: Utc::now(),
            is_match: result.is_match,
            matched_keyword: result.keyword,
            summary,
        };

        let outcome = self.gateway.upsert_page(site, &record).await?;

        if record.is_match {
            info!(
                site = %site,
                url = %url,
                keyword = record.matched_keyword.as_deref().unwrap_or_default(),
                is_new = outcome.is_new,
                "E-invoicing page found"
            );
            if outcome.is_new {
                lock(&self.new_matches).push(MatchNotice::from(&record));
            }
            lock(&self.matches).push(record.clone());
        } else {
            debug!(site = %site, url = %url, "No match");
        }

        Ok(PageOutcome::Processed {
            is_match: record.is_match,
            page_url: fetched.final_url,
            links: content.links,
        })
    }

    /// Best-effort summary; failures are logged and yield `None`
    async fn summarize(&self, title: &str, text: &str, url: &str) -> Option<String> {
        let summarizer = self.summarizer.as_ref()?;
        let input = truncate_chars(text, self.crawler.summary_input_chars);

        match summarizer.summarize(title, input, url).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(site = %self.profile.name, url = %url, error = %e, "Failed to summarize page");
                None
            }
        }
    }

    fn enqueue_links(&self, queue: &mut UrlQueue, page_url: &str, links: &[String]) {
        let Ok(page) = Url::parse(page_url) else {
            return;
        };

        let visited = lock(&self.visited);
        let mut added = 0usize;
        for href in links {
            if queue.is_full() {
                debug!(site = %self.profile.name, "Queue full, dropping discovered links");
                break;
            }
            let Some(link) = clean_link(&page, href, &self.profile.base_url) else {
                continue;
            };
            if !visited.contains(&link) && queue.try_enqueue(link) {
                added += 1;
            }
        }

        if added > 0 {
            debug!(site = %self.profile.name, page = %page_url, added, "Queued discovered links");
        }
    }

    /// Sends the new matches of the run; failures are logged
    async fn notify(&self, new_matches: &[MatchNotice]) {
        let site = self.profile.name.as_str();
        let Some(notifier) = self.notifier.as_ref() else {
            return;
        };
        if new_matches.is_empty() {
            return;
        }

        let stored = match self.gateway.settings(site).await {
            Ok(settings) => settings.webhook_url,
            Err(e) => {
                error!(site = %site, error = %e, "Failed to read settings for notification");
                None
            }
        };
        let Some(webhook) = stored
            .filter(|w| !w.is_empty())
            .or_else(|| self.default_webhook.clone())
        else {
            debug!(site = %site, "No webhook configured, skipping notification");
            return;
        };

        if let Err(e) = notifier
            .notify(&webhook, new_matches, &self.profile.label)
            .await
        {
            error!(site = %site, error = %e, "Failed to send notification");
        }
    }
}

/// Locks a mutex, recovering the data of a poisoned lock
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
