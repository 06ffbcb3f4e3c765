//! URL handling module for Invoice-Scout
//!
//! This module provides the deterministic URL key used by storage, the
//! site-scope check and link cleanup for the link-following discovery mode.

mod scope;

use sha2::{Digest, Sha256};

// Re-export main functions
pub use scope::{clean_link, is_within_base, parse_http_url};

/// Computes the storage key of a URL
///
/// The key is the hex-encoded SHA-256 digest of the URL string exactly as
/// crawled, so the same URL always maps to the same record.
///
/// # Examples
///
/// ```
/// use invoice_scout::url::hash_url;
///
/// let a = hash_url("https://mof.gov.ae/en/home/");
/// assert_eq!(a.len(), 64);
/// assert_eq!(a, hash_url("https://mof.gov.ae/en/home/"));
/// ```
pub fn hash_url(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
