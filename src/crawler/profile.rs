//! Site profiles
//!
//! A profile is everything that differs between two crawl targets, compiled
//! once from the `[[site]]` config entry.

use crate::config::{DiscoveryStrategy, SiteConfig};
use crate::crawler::ContentRules;
use crate::matcher::KeywordMatcher;
use crate::ConfigResult;

/// Compiled description of one crawl target
#[derive(Debug)]
pub struct SiteProfile {
    /// Storage partition and log field
    pub name: String,

    /// Human-readable name used in notifications
    pub label: String,

    pub base_url: String,
    pub sitemap_url: String,

    /// Crawled alone when the sitemap yields nothing
    pub seed_url: String,

    pub matcher: KeywordMatcher,
    pub content_rules: ContentRules,
    pub discovery: DiscoveryStrategy,
}

impl SiteProfile {
    /// Compiles a site's keyword table and cleanup rules
    ///
    /// # Arguments
    ///
    /// * `site` - A validated site entry
    ///
    /// # Returns
    ///
    /// * `Ok(SiteProfile)` - Profile ready for an engine
    /// * `Err(ConfigError)` - A custom pattern or widget selector is invalid
    pub fn from_config(site: &SiteConfig) -> ConfigResult<Self> {
        let matcher = KeywordMatcher::for_site(
            site.keyword_set,
            site.keywords.as_deref(),
            site.patterns.as_deref(),
        )?;
        let content_rules = ContentRules::new(&site.widget_rules)?;

        Ok(Self {
            name: site.name.clone(),
            label: site.label.clone(),
            base_url: site.base_url.clone(),
            sitemap_url: site.sitemap_url.clone(),
            seed_url: site.seed_url.clone(),
            matcher,
            content_rules,
            discovery: site.discovery,
        })
    }
}
