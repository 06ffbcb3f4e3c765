use crate::config::types::{
    Config, CrawlerConfig, NotificationConfig, OutputConfig, SiteConfig, SummarizerConfig,
    WidgetRule,
};
use crate::url::is_within_base;
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    if let Some(summarizer) = &config.summarizer {
        validate_summarizer_config(summarizer)?;
    }
    validate_notification_config(&config.notification)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be <= 60000ms, got {}ms",
            config.request_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_body_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= 1024, got {}",
            config.max_body_bytes
        )));
    }

    if config.max_redirects > 20 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= 20, got {}",
            config.max_redirects
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.content_preview_chars == 0 || config.summary_input_chars == 0 {
        return Err(ConfigError::Validation(
            "content_preview_chars and summary_input_chars must be >= 1".to_string(),
        ));
    }

    if config.max_queue_size < 1 {
        return Err(ConfigError::Validation(format!(
            "max_queue_size must be >= 1, got {}",
            config.max_queue_size
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_summarizer_config(config: &SummarizerConfig) -> Result<(), ConfigError> {
    validate_http_url("summarizer api_url", &config.api_url)?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "summarizer model cannot be empty".to_string(),
        ));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "summarizer api_key_env cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "summarizer timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "summarizer temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    Ok(())
}

fn validate_notification_config(config: &NotificationConfig) -> Result<(), ConfigError> {
    if let Some(webhook) = &config.webhook_url {
        validate_http_url("webhook_url", webhook)?;
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    Ok(())
}

/// Validates every site entry and the uniqueness of their names
fn validate_sites(sites: &[SiteConfig]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[site]] entry is required".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for site in sites {
        validate_site(site)?;
        if !names.insert(site.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site name '{}'",
                site.name
            )));
        }
    }

    Ok(())
}

fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
    if site.name.is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    if !site
        .name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "site name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            site.name
        )));
    }

    validate_http_url("base_url", &site.base_url)?;
    validate_http_url("sitemap_url", &site.sitemap_url)?;
    validate_http_url("seed_url", &site.seed_url)?;

    // Sitemaps may live on a CDN, the seed may not
    if !is_within_base(&site.seed_url, &site.base_url) {
        return Err(ConfigError::Validation(format!(
            "seed_url '{}' of site '{}' is outside base_url '{}'",
            site.seed_url, site.name, site.base_url
        )));
    }

    if let Some(keywords) = &site.keywords {
        if keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "site '{}' has an empty keyword",
                site.name
            )));
        }
    }

    if let Some(patterns) = &site.patterns {
        for pattern in patterns {
            Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidPattern(format!(
                    "site '{}' pattern '{}': {}",
                    site.name, pattern, e
                ))
            })?;
        }
    }

    for rule in &site.widget_rules {
        validate_widget_rule(&site.name, rule)?;
    }

    Ok(())
}

fn validate_widget_rule(site: &str, rule: &WidgetRule) -> Result<(), ConfigError> {
    if rule.heading_labels.is_empty() || rule.heading_labels.iter().any(|l| l.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "widget rule of site '{}' needs at least one non-empty heading label",
            site
        )));
    }

    Selector::parse(&rule.heading_selector).map_err(|e| {
        ConfigError::InvalidPattern(format!(
            "widget rule of site '{}' has invalid heading selector '{}': {:?}",
            site, rule.heading_selector, e
        ))
    })?;

    Ok(())
}

/// Validates that a URL parses and uses http or https
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https, got '{}'",
            field, value, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryStrategy;
    use crate::matcher::KeywordSet;

    fn create_test_site() -> SiteConfig {
        SiteConfig {
            name: "uae".to_string(),
            label: "UAE".to_string(),
            base_url: "https://mof.gov.ae".to_string(),
            sitemap_url: "https://cdn.example.com/sitemap_index.xml".to_string(),
            seed_url: "https://mof.gov.ae/en/home/".to_string(),
            keyword_set: KeywordSet::Uae,
            keywords: None,
            patterns: None,
            discovery: DiscoveryStrategy::Sitemap,
            widget_rules: Vec::new(),
        }
    }

    #[test]
    fn test_valid_site() {
        assert!(validate_site(&create_test_site()).is_ok());
    }

    #[test]
    fn test_seed_outside_base_rejected() {
        let mut site = create_test_site();
        site.seed_url = "https://example.com/".to_string();
        assert!(matches!(
            validate_site(&site),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_custom_pattern_rejected() {
        let mut site = create_test_site();
        site.patterns = Some(vec!["(unclosed".to_string()]);
        assert!(matches!(
            validate_site(&site),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_widget_rule_needs_label() {
        let mut site = create_test_site();
        site.widget_rules.push(WidgetRule {
            heading_labels: Vec::new(),
            heading_selector: "h2".to_string(),
            min_links: 2,
        });
        assert!(validate_site(&site).is_err());
    }

    #[test]
    fn test_duplicate_site_names_rejected() {
        let sites = vec![create_test_site(), create_test_site()];
        assert!(validate_sites(&sites).is_err());
        assert!(validate_sites(&[]).is_err());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("x", "https://example.com").is_ok());
        assert!(validate_http_url("x", "http://example.com/a").is_ok());
        assert!(validate_http_url("x", "ftp://example.com").is_err());
        assert!(validate_http_url("x", "not a url").is_err());
    }
}
