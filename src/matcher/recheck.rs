//! Re-classification of stored matches
//!
//! Keyword tables change over time. This pass runs the current table over
//! every stored match of a site, demotes the pages that no longer qualify and
//! refreshes the reported keyword of the others.

use crate::matcher::KeywordMatcher;
use crate::storage::{PersistenceGateway, StorageResult};
use tracing::{debug, info};

/// Outcome of a match recheck
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecheckReport {
    /// Still a match with the same keyword
    pub unchanged: usize,
    /// Still a match, keyword rewritten
    pub relabeled: usize,
    /// No longer a match
    pub removed: usize,
}

/// Re-classifies every stored match of `site` with `matcher`
///
/// Classification uses the stored title, content preview and URL.
///
/// # Returns
///
/// * `Ok(RecheckReport)` - Counts per outcome
/// * `Err(StorageError)` - A read or write failed; earlier changes are kept
pub async fn recheck_matches(
    gateway: &dyn PersistenceGateway,
    site: &str,
    matcher: &KeywordMatcher,
) -> StorageResult<RecheckReport> {
    let matches = gateway.match_pages(site).await?;
    let mut report = RecheckReport::default();

    info!(site = %site, pages = matches.len(), "Rechecking stored matches");

    for page in &matches {
        let result = matcher.match_page(&page.content, &page.title, &page.url);
        match result.keyword {
            None => {
                gateway.remove_match(site, &page.url).await?;
                info!(site = %site, url = %page.url, "No keyword left, match removed");
                report.removed += 1;
            }
            Some(keyword) if page.matched_keyword.as_deref() == Some(keyword.as_str()) => {
                report.unchanged += 1;
            }
            Some(keyword) => {
                gateway.update_matched_keyword(site, &page.url, &keyword).await?;
                debug!(site = %site, url = %page.url, keyword = %keyword, "Keyword updated");
                report.relabeled += 1;
            }
        }
    }

    info!(
        site = %site,
        unchanged = report.unchanged,
        relabeled = report.relabeled,
        removed = report.removed,
        "Match recheck finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PageRecord, SqliteGateway};
    use chrono::Utc;

    fn create_test_matcher() -> KeywordMatcher {
        KeywordMatcher::new(["e-invoicing", "tax invoice"], Vec::<&str>::new()).unwrap()
    }

    fn create_test_match(url: &str, title: &str, content: &str, keyword: Option<&str>) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: title.to_string(),
            content_preview: content.to_string(),
            scraped_at: Utc::now(),
            is_match: true,
            matched_keyword: keyword.map(str::to_string),
            summary: Some("Summary".to_string()),
        }
    }

    #[tokio::test]
    async fn test_recheck_matches() {
        let gateway = SqliteGateway::new_in_memory().unwrap();
        let pages = [
            create_test_match(
                "https://a.test/kept",
                "Reform",
                "e-invoicing becomes mandatory",
                Some("e-invoicing"),
            ),
            create_test_match(
                "https://a.test/relabel",
                "Guidance",
                "How to issue a tax invoice",
                None,
            ),
            create_test_match(
                "https://a.test/gone",
                "Working from home",
                "Wellbeing podcast for civil servants",
                Some("digital"),
            ),
        ];
        for page in &pages {
            gateway.upsert_page("be", page).await.unwrap();
        }

        let report = recheck_matches(&gateway, "be", &create_test_matcher())
            .await
            .unwrap();

        assert_eq!(
            report,
            RecheckReport {
                unchanged: 1,
                relabeled: 1,
                removed: 1,
            }
        );

        let stored = gateway.match_pages("be").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|m| m.url != "https://a.test/gone"));
        let relabeled = stored
            .iter()
            .find(|m| m.url == "https://a.test/relabel")
            .unwrap();
        assert_eq!(relabeled.matched_keyword.as_deref(), Some("tax invoice"));

        // The demoted page is still known, so only-new runs skip it
        assert_eq!(gateway.stats("be").await.unwrap().total_pages, 3);
    }

    #[tokio::test]
    async fn test_recheck_without_matches() {
        let gateway = SqliteGateway::new_in_memory().unwrap();
        let report = recheck_matches(&gateway, "be", &create_test_matcher())
            .await
            .unwrap();
        assert_eq!(report, RecheckReport::default());
    }
}
