//! Sitemap resolver
//!
//! Fetches a sitemap index, walks its child sitemaps one after the other and
//! collects every page URL that lies inside the site's base URL.

use crate::crawler::fetch_text;
use crate::sitemap::{parse_sitemap, SitemapDocument, SitemapError, SitemapResult};
use crate::url::is_within_base;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolves a site's sitemap into a flat list of candidate URLs
#[derive(Debug, Clone)]
pub struct SitemapResolver {
    client: Client,

    /// Pause before each child sitemap fetch
    request_delay: Duration,

    max_body_bytes: usize,
}

impl SitemapResolver {
    pub fn new(client: Client, request_delay: Duration, max_body_bytes: usize) -> Self {
        Self {
            client,
            request_delay,
            max_body_bytes,
        }
    }

    /// Fetches and parses one sitemap document
    pub async fn fetch_document(&self, url: &str) -> SitemapResult<SitemapDocument> {
        let page = fetch_text(&self.client, url, self.max_body_bytes)
            .await
            .map_err(|source| SitemapError::Fetch {
                url: url.to_string(),
                source,
            })?;
        parse_sitemap(&page.body)
    }

    /// Discovers page URLs starting at `sitemap_url`
    ///
    /// # Discovery Flow
    ///
    /// 1. Fetch the document at `sitemap_url`
    /// 2. If it lists child sitemaps, fetch each one in order (waiting the
    ///    request delay first) and collect its `<url>` entries
    /// 3. Otherwise read the same document as a leaf sitemap
    ///
    /// Only URLs inside `base_url` are kept, deduplicated in discovery order.
    /// A failing document contributes no URLs; this never returns an error.
    /// An empty result is the caller's cue to fall back to the seed URL.
    ///
    /// # Arguments
    ///
    /// * `sitemap_url` - The sitemap index or leaf sitemap
    /// * `base_url` - Scope filter for page URLs
    /// * `stop` - Checked before each child sitemap
    /// * `progress` - Receives a human-readable status line before each fetch
    pub async fn discover<F>(
        &self,
        sitemap_url: &str,
        base_url: &str,
        stop: &AtomicBool,
        mut progress: F,
    ) -> Vec<String>
    where
        F: FnMut(String),
    {
        progress(sitemap_url.to_string());

        let root = match self.fetch_document(sitemap_url).await {
            Ok(document) => document,
            Err(e) => {
                warn!(url = %sitemap_url, error = %e, "Failed to read sitemap");
                return Vec::new();
            }
        };

        let mut collector = UrlCollector::new(base_url);

        if !root.is_index() {
            debug!(url = %sitemap_url, "Sitemap has no child sitemaps, reading it as a leaf");
            collector.extend(root.urls);
            return collector.into_urls();
        }

        let total = root.sitemaps.len();
        info!(url = %sitemap_url, children = total, "Resolving sitemap index");

        for (index, child_url) in root.sitemaps.iter().enumerate() {
            if stop.load(Ordering::SeqCst) {
                info!("Stop requested during sitemap discovery");
                break;
            }

            progress(format!("Parsing sitemap {}/{}: {}", index + 1, total, child_url));

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            match self.fetch_document(child_url).await {
                Ok(child) => {
                    let before = collector.len();
                    collector.extend(child.urls);
                    debug!(url = %child_url, added = collector.len() - before, "Parsed child sitemap");
                }
                Err(e) => warn!(url = %child_url, error = %e, "Failed to read child sitemap"),
            }
        }

        collector.into_urls()
    }
}

/// Ordered, deduplicated, scope-filtered URL accumulator
struct UrlCollector<'a> {
    base_url: &'a str,
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl<'a> UrlCollector<'a> {
    fn new(base_url: &'a str) -> Self {
        Self {
            base_url,
            seen: HashSet::new(),
            urls: Vec::new(),
        }
    }

    fn extend(&mut self, urls: Vec<String>) {
        for url in urls {
            if is_within_base(&url, self.base_url) && self.seen.insert(url.clone()) {
                self.urls.push(url);
            }
        }
    }

    fn len(&self) -> usize {
        self.urls.len()
    }

    fn into_urls(self) -> Vec<String> {
        self.urls
    }
}
