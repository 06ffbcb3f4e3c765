//! Sitemap discovery
//!
//! This module turns a sitemap index (or a single leaf sitemap) into the flat,
//! deduplicated list of page URLs a crawl run starts from.

mod parser;
mod resolver;

pub use parser::{parse_sitemap, SitemapDocument};
pub use resolver::SitemapResolver;

use crate::crawler::FetchError;
use thiserror::Error;

/// Errors raised while reading a single sitemap document
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Failed to fetch sitemap {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Malformed sitemap XML: {0}")]
    Xml(String),
}

/// Result type for sitemap operations
pub type SitemapResult<T> = Result<T, SitemapError>;
