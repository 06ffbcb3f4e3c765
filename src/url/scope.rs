use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a URL and rejects anything that is not http(s) with a host
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Returns true if `url` lies inside the site rooted at `base`
///
/// Scheme, host and port must be equal and the path must start with the
/// base path. Host comparison is case-insensitive, so
/// `https://MOF.gov.ae/en` is inside `https://mof.gov.ae`, while
/// `https://mof.gov.ae.example.com/` is not.
///
/// # Examples
///
/// ```
/// use invoice_scout::url::is_within_base;
///
/// assert!(is_within_base("https://mof.gov.ae/en/home/", "https://mof.gov.ae"));
/// assert!(!is_within_base("https://mof.gov.ae.evil.com/", "https://mof.gov.ae"));
/// ```
pub fn is_within_base(url: &str, base: &str) -> bool {
    let (Ok(url), Ok(base)) = (parse_http_url(url), parse_http_url(base)) else {
        return false;
    };

    if url.scheme() != base.scheme()
        || url.host_str().map(str::to_lowercase) != base.host_str().map(str::to_lowercase)
        || url.port_or_known_default() != base.port_or_known_default()
    {
        return false;
    }

    let base_path = base.path().trim_end_matches('/');
    let path = url.path();
    base_path.is_empty()
        || path == base_path
        || path
            .strip_prefix(base_path)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Resolves a link found on `page` and prepares it for the crawl queue
///
/// Relative links are resolved against the page, query and fragment are
/// dropped, and links outside `base` or with a non-http(s) scheme yield
/// `None`.
pub fn clean_link(page: &Url, href: &str, base: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }

    let mut resolved = page.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    resolved.set_query(None);
    resolved.set_fragment(None);

    let cleaned = resolved.to_string();
    is_within_base(&cleaned, base).then_some(cleaned)
}
