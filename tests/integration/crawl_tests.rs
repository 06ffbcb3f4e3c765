//! Integration tests for the crawl engine
//!
//! These tests use wiremock to create mock sites, sitemaps, summarizer APIs
//! and webhooks, and test full runs end-to-end against an in-memory gateway.

use async_trait::async_trait;
use invoice_scout::config::{
    CrawlerConfig, DiscoveryStrategy, NotificationConfig, SiteConfig, SummarizerConfig,
};
use invoice_scout::crawler::{
    build_http_client, trigger_scheduled, CrawlEngine, RunMode, RunOptions, SiteProfile,
    SkipReason, TriggerOutcome,
};
use invoice_scout::matcher::KeywordSet;
use invoice_scout::notify::WebhookNotifier;
use invoice_scout::state::{SessionStatus, VisitedStore};
use invoice_scout::storage::{
    GatewayStats, PageRecord, PersistenceGateway, RunRecord, RunSummary, SettingsUpdate,
    SiteSettings, SqliteGateway, StorageError, StorageResult, StoredMatch, UpsertOutcome,
};
use invoice_scout::summarize::ChatSummarizer;
use invoice_scout::ScoutError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "test";

// ===== Helpers =====

/// Creates a site entry scoped to the mock server
fn create_test_site(server: &MockServer) -> SiteConfig {
    SiteConfig {
        name: SITE.to_string(),
        label: "Testland".to_string(),
        base_url: server.uri(),
        sitemap_url: format!("{}/sitemap.xml", server.uri()),
        seed_url: format!("{}/home", server.uri()),
        keyword_set: KeywordSet::Uae,
        keywords: None,
        patterns: None,
        discovery: DiscoveryStrategy::Sitemap,
        widget_rules: vec![],
    }
}

/// Creates a crawler configuration without throttling
fn create_test_crawler() -> CrawlerConfig {
    CrawlerConfig {
        request_delay_ms: 0,
        request_timeout_secs: 5,
        ..CrawlerConfig::default()
    }
}

fn create_engine(site: &SiteConfig, gateway: Arc<dyn PersistenceGateway>) -> CrawlEngine {
    let crawler = create_test_crawler();
    let client = build_http_client(&crawler).unwrap();
    let profile = SiteProfile::from_config(site).unwrap();
    CrawlEngine::new(profile, crawler, client, gateway)
}

fn in_memory_gateway() -> Arc<SqliteGateway> {
    Arc::new(SqliteGateway::new_in_memory().unwrap())
}

fn html(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body><main>{}</main></body></html>",
        title, body
    )
}

async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_slow_page(server: &MockServer, at: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html("Slow", "Customs tariffs"))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

fn seeds(server: &MockServer, paths: &[&str]) -> Vec<String> {
    paths
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect()
}

fn seeded(server: &MockServer, paths: &[&str]) -> RunOptions {
    RunOptions {
        seed_urls: seeds(server, paths),
        ..RunOptions::manual()
    }
}

fn page_record(url: String) -> PageRecord {
    PageRecord {
        url,
        title: "Old".to_string(),
        content_preview: "old".to_string(),
        scraped_at: chrono::Utc::now(),
        is_match: false,
        matched_keyword: None,
        summary: None,
    }
}

// ===== Run accounting =====

#[tokio::test]
async fn test_seeded_run_with_duplicate() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", html("Reform", "The new e-invoice mandate starts in 2026")).await;
    mount_page(&server, "/b", html("Customs", "Customs tariffs for imported goods")).await;

    let gateway = in_memory_gateway();
    let engine = create_engine(&create_test_site(&server), gateway.clone());

    let session = engine
        .run(seeded(&server, &["/a", "/b", "/a"]))
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.total_pages_crawled, 2);
    assert_eq!(session.duplicates_ignored, 1);
    assert_eq!(session.e_invoicing_pages_found, 1);
    assert!(session.current_url.is_none());
    assert!(session.completed_at.is_some());
    assert!(!engine.is_running());

    let matches = gateway.match_pages(SITE).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].url, format!("{}/a", server.uri()));
    assert_eq!(matches[0].matched_keyword.as_deref(), Some("e-invoice"));

    let stats = gateway.stats(SITE).await.unwrap();
    assert_eq!(stats.total_pages, 2);
    assert_eq!(stats.match_pages, 1);

    let runs = gateway.recent_runs(SITE, 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].summary.mode, RunMode::Manual);
    assert_eq!(runs[0].summary.status, SessionStatus::Completed);
    assert_eq!(runs[0].summary.total_pages_crawled, 2);
    assert_eq!(runs[0].summary.new_match_count, 1);

    assert_eq!(engine.matches().len(), 1);
    assert_eq!(engine.new_matches().len(), 1);
}

#[tokio::test]
async fn test_second_run_finds_no_new_matches() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", html("Reform", "e-invoicing for all businesses")).await;

    let gateway = in_memory_gateway();
    let engine = create_engine(&create_test_site(&server), gateway.clone());

    engine.run(seeded(&server, &["/a"])).await.unwrap();
    let session = engine.run(seeded(&server, &["/a"])).await.unwrap();

    // Counters reset per run; the match is known now
    assert_eq!(session.total_pages_crawled, 1);
    assert_eq!(session.e_invoicing_pages_found, 1);
    assert_eq!(engine.matches().len(), 1);
    assert!(engine.new_matches().is_empty());

    let runs = gateway.recent_runs(SITE, 10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].summary.new_match_count, 0);
}

#[tokio::test]
async fn test_fetch_errors_count_as_crawled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/a", html("Reform", "e-invoicing")).await;

    let gateway = in_memory_gateway();
    let engine = create_engine(&create_test_site(&server), gateway.clone());

    let session = engine
        .run(seeded(&server, &["/missing", "/a"]))
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.total_pages_crawled, 2);
    assert_eq!(session.e_invoicing_pages_found, 1);
    assert_eq!(gateway.stats(SITE).await.unwrap().total_pages, 1);
}

#[tokio::test]
async fn test_only_new_filters_known_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html("A", "e-invoice")))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/b", html("B", "Customs tariffs")).await;

    let gateway = in_memory_gateway();
    gateway
        .upsert_page(SITE, &page_record(format!("{}/a", server.uri())))
        .await
        .unwrap();

    let engine = create_engine(&create_test_site(&server), gateway.clone());
    let options = RunOptions {
        only_new: true,
        ..seeded(&server, &["/a", "/b"])
    };
    let session = engine.run(options).await.unwrap();

    assert_eq!(session.total_pages_crawled, 1);
    assert_eq!(session.duplicates_ignored, 0);
}

#[tokio::test]
async fn test_title_keyword_match() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/portal",
        html("Electronic Invoice Portal", "Welcome to the services portal"),
    )
    .await;

    let gateway = in_memory_gateway();
    let engine = create_engine(&create_test_site(&server), gateway.clone());
    engine.run(seeded(&server, &["/portal"])).await.unwrap();

    let matches = gateway.match_pages(SITE).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].title, "Electronic Invoice Portal");
    assert_eq!(matches[0].matched_keyword.as_deref(), Some("electronic invoice"));
}

#[tokio::test]
async fn test_injected_visited_store_sees_urls() {
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<HashSet<String>>>);

    impl VisitedStore for SharedStore {
        fn insert(&mut self, url: &str) -> bool {
            self.0.lock().unwrap().insert(url.to_string())
        }
        fn contains(&self, url: &str) -> bool {
            self.0.lock().unwrap().contains(url)
        }
        fn clear(&mut self) {
            self.0.lock().unwrap().clear()
        }
        fn len(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    let server = MockServer::start().await;
    mount_page(&server, "/a", html("A", "Customs")).await;
    mount_page(&server, "/b", html("B", "Customs")).await;

    let store = SharedStore::default();
    let engine = create_engine(&create_test_site(&server), in_memory_gateway())
        .with_visited_store(Box::new(store.clone()));
    engine.run(seeded(&server, &["/a", "/b", "/b"])).await.unwrap();

    let seen = store.0.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.contains(&format!("{}/b", server.uri())));
}

// ===== Lifecycle =====

#[tokio::test]
async fn test_start_while_running_is_busy() {
    let server = MockServer::start().await;
    mount_slow_page(&server, "/slow", Duration::from_millis(500)).await;

    let engine = Arc::new(create_engine(&create_test_site(&server), in_memory_gateway()));

    let handle = engine.start(seeded(&server, &["/slow"])).unwrap();
    assert!(engine.is_running());
    assert_eq!(engine.snapshot().status, SessionStatus::Scraping);

    let second = engine.start(seeded(&server, &["/slow"]));
    assert!(matches!(second, Err(ScoutError::Busy { ref site }) if site == SITE));
    assert!(matches!(
        engine.run(RunOptions::manual()).await,
        Err(ScoutError::Busy { .. })
    ));

    handle.await.unwrap();

    let session = engine.snapshot();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.total_pages_crawled, 1);
    assert!(!engine.is_running());

    // A new run is accepted once the first one is finalized
    let again = engine.start(seeded(&server, &["/slow"])).unwrap();
    again.await.unwrap();
}

#[tokio::test]
async fn test_stop_mid_run() {
    let server = MockServer::start().await;
    for n in 1..=5 {
        mount_slow_page(&server, &format!("/p{}", n), Duration::from_millis(300)).await;
    }

    let gateway = in_memory_gateway();
    let engine = Arc::new(create_engine(&create_test_site(&server), gateway.clone()));

    let handle = engine
        .start(seeded(&server, &["/p1", "/p2", "/p3", "/p4", "/p5"]))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(engine.stop());
    handle.await.unwrap();

    let session = engine.snapshot();
    assert_eq!(session.status, SessionStatus::Stopped);
    assert!(session.total_pages_crawled >= 1);
    assert!(session.total_pages_crawled < 5);
    assert!(session.current_url.is_none());

    let runs = gateway.recent_runs(SITE, 1).await.unwrap();
    assert_eq!(runs[0].summary.status, SessionStatus::Stopped);
    assert_eq!(
        runs[0].summary.total_pages_crawled,
        session.total_pages_crawled
    );
}

#[tokio::test]
async fn test_stop_when_idle() {
    let server = MockServer::start().await;
    let engine = create_engine(&create_test_site(&server), in_memory_gateway());
    assert!(!engine.stop());
    assert_eq!(engine.snapshot().status, SessionStatus::Idle);
}

// ===== Discovery =====

#[tokio::test]
async fn test_sitemap_index_without_children_is_leaf() {
    let server = MockServer::start().await;
    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{0}/p1</loc></url>
  <url><loc>{0}/p2</loc></url>
  <url><loc>https://elsewhere.test/p3</loc></url>
</urlset>"#,
        server.uri()
    );
    mount_page(&server, "/sitemap.xml", sitemap).await;
    mount_page(&server, "/p1", html("P1", "e-invoicing")).await;
    mount_page(&server, "/p2", html("P2", "Customs")).await;

    let engine = create_engine(&create_test_site(&server), in_memory_gateway());
    let session = engine.run(RunOptions::manual()).await.unwrap();

    assert_eq!(session.total_pages_crawled, 2);
    assert_eq!(session.e_invoicing_pages_found, 1);
}

#[tokio::test]
async fn test_sitemap_index_with_children() {
    let server = MockServer::start().await;
    let index = format!(
        r#"<sitemapindex><sitemap><loc>{0}/s1.xml</loc></sitemap><sitemap><loc>{0}/s2.xml</loc></sitemap></sitemapindex>"#,
        server.uri()
    );
    mount_page(&server, "/sitemap.xml", index).await;
    mount_page(
        &server,
        "/s1.xml",
        format!("<urlset><url><loc>{}/p1</loc></url></urlset>", server.uri()),
    )
    .await;
    mount_page(
        &server,
        "/s2.xml",
        format!(
            "<urlset><url><loc>{0}/p1</loc></url><url><loc>{0}/p2</loc></url></urlset>",
            server.uri()
        ),
    )
    .await;
    mount_page(&server, "/p1", html("P1", "Customs")).await;
    mount_page(&server, "/p2", html("P2", "Customs")).await;

    let engine = create_engine(&create_test_site(&server), in_memory_gateway());
    let session = engine.run(RunOptions::manual()).await.unwrap();

    // The resolver deduplicates across child sitemaps
    assert_eq!(session.total_pages_crawled, 2);
    assert_eq!(session.duplicates_ignored, 0);
}

#[tokio::test]
async fn test_empty_sitemap_falls_back_to_seed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/home", html("Home", "Tax invoice guidance")).await;

    let gateway = in_memory_gateway();
    let engine = create_engine(&create_test_site(&server), gateway.clone());
    let session = engine.run(RunOptions::manual()).await.unwrap();

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.total_pages_crawled, 1);
    assert_eq!(session.e_invoicing_pages_found, 1);
}

#[tokio::test]
async fn test_link_following_discovery() {
    let server = MockServer::start().await;
    let start = html(
        "Start",
        &format!(
            r##"<a href="/l1">One</a>
               <a href="/l1?ref=menu">One again</a>
               <a href="/l2#section">Two</a>
               <a href="https://elsewhere.test/x">External</a>
               <a href="mailto:info@example.com">Mail</a>
               <a href="{}/start">Self</a>"##,
            server.uri()
        ),
    );
    mount_page(&server, "/start", start).await;
    mount_page(&server, "/l1", html("L1", "Customs")).await;
    mount_page(&server, "/l2", html("L2", "e-invoicing")).await;

    let mut site = create_test_site(&server);
    site.discovery = DiscoveryStrategy::SitemapAndLinks;
    let engine = create_engine(&site, in_memory_gateway());

    let session = engine.run(seeded(&server, &["/start"])).await.unwrap();

    assert_eq!(session.total_pages_crawled, 3);
    assert_eq!(session.duplicates_ignored, 0);
    assert_eq!(session.e_invoicing_pages_found, 1);
}

#[tokio::test]
async fn test_links_ignored_with_sitemap_discovery() {
    let server = MockServer::start().await;
    mount_page(&server, "/start", html("Start", r#"<a href="/l1">One</a>"#)).await;
    Mock::given(method("GET"))
        .and(path("/l1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let engine = create_engine(&create_test_site(&server), in_memory_gateway());
    let session = engine.run(seeded(&server, &["/start"])).await.unwrap();
    assert_eq!(session.total_pages_crawled, 1);
}

// ===== Summaries =====

#[tokio::test]
async fn test_summary_stored_with_match() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", html("Reform", "e-invoicing becomes mandatory")).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Mandatory e-invoicing."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = SummarizerConfig {
        api_url: format!("{}/v1/chat/completions", server.uri()),
        ..SummarizerConfig::default()
    };
    let summarizer = Arc::new(ChatSummarizer::new(&config, "key").unwrap());

    let gateway = in_memory_gateway();
    let engine = create_engine(&create_test_site(&server), gateway.clone()).with_summarizer(summarizer);
    engine.run(seeded(&server, &["/a"])).await.unwrap();

    let matches = gateway.match_pages(SITE).await.unwrap();
    assert_eq!(matches[0].summary.as_deref(), Some("Mandatory e-invoicing."));
    assert_eq!(
        engine.new_matches()[0].summary.as_deref(),
        Some("Mandatory e-invoicing.")
    );
}

#[tokio::test]
async fn test_summary_failure_keeps_match() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", html("Reform", "e-invoicing becomes mandatory")).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = SummarizerConfig {
        api_url: format!("{}/v1/chat/completions", server.uri()),
        ..SummarizerConfig::default()
    };
    let summarizer = Arc::new(ChatSummarizer::new(&config, "key").unwrap());

    let gateway = in_memory_gateway();
    let engine = create_engine(&create_test_site(&server), gateway.clone()).with_summarizer(summarizer);
    let session = engine.run(seeded(&server, &["/a"])).await.unwrap();

    assert_eq!(session.status, SessionStatus::Completed);
    let matches = gateway.match_pages(SITE).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].summary.is_none());
}

// ===== Notifications =====

fn create_notifier() -> Arc<WebhookNotifier> {
    Arc::new(
        WebhookNotifier::new(reqwest::Client::new(), &NotificationConfig::default())
            .with_batch_delay(Duration::ZERO),
    )
}

#[tokio::test]
async fn test_new_matches_notified_in_batches() {
    let server = MockServer::start().await;
    let mut paths = Vec::new();
    for n in 1..=23 {
        let at = format!("/m{}", n);
        mount_page(&server, &at, html(&format!("Match {}", n), "e-invoicing")).await;
        paths.push(at);
    }
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let engine = create_engine(&create_test_site(&server), in_memory_gateway())
        .with_notifier(create_notifier(), Some(format!("{}/hook", server.uri())));
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    engine.run(seeded(&server, &path_refs)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let texts: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == "/hook")
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["text"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(texts.len(), 3);
    assert!(texts[0].starts_with("🧾 *New E-Invoicing Pages Found - Testland* (Part 1/3)"));
    assert!(texts[1].contains("(Part 2/3)"));
    assert!(texts[2].contains("(Part 3/3)"));
    assert!(texts[2].contains("23. **[Match 23]"));
}

#[tokio::test]
async fn test_site_webhook_overrides_default() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", html("Reform", "e-invoicing")).await;
    Mock::given(method("POST"))
        .and(path("/site-hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/default-hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = in_memory_gateway();
    gateway
        .update_settings(
            SITE,
            SettingsUpdate {
                webhook_url: Some(Some(format!("{}/site-hook", server.uri()))),
                ..SettingsUpdate::default()
            },
        )
        .await
        .unwrap();

    let engine = create_engine(&create_test_site(&server), gateway.clone())
        .with_notifier(create_notifier(), Some(format!("{}/default-hook", server.uri())));
    engine.run(seeded(&server, &["/a"])).await.unwrap();
}

#[tokio::test]
async fn test_webhook_failure_does_not_affect_run() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", html("Reform", "e-invoicing")).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = in_memory_gateway();
    let engine = create_engine(&create_test_site(&server), gateway.clone())
        .with_notifier(create_notifier(), Some(format!("{}/hook", server.uri())));
    let session = engine.run(seeded(&server, &["/a"])).await.unwrap();

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(gateway.recent_runs(SITE, 1).await.unwrap().len(), 1);
    assert_eq!(gateway.match_pages(SITE).await.unwrap().len(), 1);
}

// ===== Scheduled trigger =====

#[tokio::test]
async fn test_trigger_scheduled() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/sitemap.xml",
        format!("<urlset><url><loc>{}/p1</loc></url></urlset>", server.uri()),
    )
    .await;
    mount_page(&server, "/p1", html("P1", "Customs")).await;

    let gateway = in_memory_gateway();
    let engine = Arc::new(create_engine(&create_test_site(&server), gateway.clone()));

    let outcome = trigger_scheduled(&engine).await.unwrap();
    assert!(matches!(
        outcome,
        TriggerOutcome::Skipped(SkipReason::AutoRunDisabled)
    ));

    gateway
        .update_settings(
            SITE,
            SettingsUpdate {
                auto_run_enabled: Some(true),
                ..SettingsUpdate::default()
            },
        )
        .await
        .unwrap();

    let TriggerOutcome::Started(handle) = trigger_scheduled(&engine).await.unwrap() else {
        panic!("expected the scheduled run to start");
    };
    handle.await.unwrap();

    let runs = gateway.recent_runs(SITE, 1).await.unwrap();
    assert_eq!(runs[0].summary.mode, RunMode::Auto);

    let settings = gateway.settings(SITE).await.unwrap();
    assert!(settings.last_auto_run_at.is_some());
    assert!(settings.last_manual_run_at.is_none());

    // Auto runs are "only new": the page is known now
    let TriggerOutcome::Started(handle) = trigger_scheduled(&engine).await.unwrap() else {
        panic!("expected the scheduled run to start");
    };
    handle.await.unwrap();
    assert_eq!(engine.snapshot().total_pages_crawled, 0);
}

#[tokio::test]
async fn test_trigger_scheduled_while_running() {
    let server = MockServer::start().await;
    mount_slow_page(&server, "/slow", Duration::from_millis(300)).await;

    let gateway = in_memory_gateway();
    gateway
        .update_settings(
            SITE,
            SettingsUpdate {
                auto_run_enabled: Some(true),
                ..SettingsUpdate::default()
            },
        )
        .await
        .unwrap();

    let engine = Arc::new(create_engine(&create_test_site(&server), gateway.clone()));
    let handle = engine.start(seeded(&server, &["/slow"])).unwrap();

    let outcome = trigger_scheduled(&engine).await.unwrap();
    assert!(matches!(
        outcome,
        TriggerOutcome::Skipped(SkipReason::AlreadyRunning)
    ));
    handle.await.unwrap();
}

// ===== Fatal errors =====

/// Gateway whose page writes always fail
#[derive(Default)]
struct BrokenGateway {
    runs: Mutex<Vec<RunSummary>>,
}

#[async_trait]
impl PersistenceGateway for BrokenGateway {
    async fn known_url_hashes(&self, _site: &str) -> StorageResult<HashSet<String>> {
        Ok(HashSet::new())
    }

    async fn upsert_page(&self, _site: &str, _page: &PageRecord) -> StorageResult<UpsertOutcome> {
        Err(StorageError::Database("disk unavailable".to_string()))
    }

    async fn record_run_summary(&self, _site: &str, summary: &RunSummary) -> StorageResult<()> {
        self.runs.lock().unwrap().push(summary.clone());
        Ok(())
    }

    async fn settings(&self, _site: &str) -> StorageResult<SiteSettings> {
        Ok(SiteSettings::default())
    }

    async fn update_settings(&self, _site: &str, _update: SettingsUpdate) -> StorageResult<SiteSettings> {
        Ok(SiteSettings::default())
    }

    async fn clear_all(&self, _site: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn match_pages(&self, _site: &str) -> StorageResult<Vec<StoredMatch>> {
        Ok(Vec::new())
    }

    async fn stats(&self, _site: &str) -> StorageResult<GatewayStats> {
        Ok(GatewayStats::default())
    }

    async fn recent_runs(&self, _site: &str, _limit: usize) -> StorageResult<Vec<RunRecord>> {
        Ok(Vec::new())
    }

    async fn update_summary(&self, _site: &str, url: &str, _summary: &str) -> StorageResult<()> {
        Err(StorageError::PageNotFound(url.to_string()))
    }

    async fn update_matched_keyword(&self, _site: &str, url: &str, _keyword: &str) -> StorageResult<()> {
        Err(StorageError::PageNotFound(url.to_string()))
    }

    async fn remove_match(&self, _site: &str, url: &str) -> StorageResult<()> {
        Err(StorageError::PageNotFound(url.to_string()))
    }
}

#[tokio::test]
async fn test_gateway_failure_is_fatal() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", html("A", "Customs")).await;
    mount_page(&server, "/b", html("B", "Customs")).await;

    let gateway = Arc::new(BrokenGateway::default());
    let engine = create_engine(&create_test_site(&server), gateway.clone());

    let session = engine.run(seeded(&server, &["/a", "/b"])).await.unwrap();

    assert_eq!(session.status, SessionStatus::Error);
    assert!(session
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("disk unavailable")));
    assert_eq!(session.total_pages_crawled, 0);
    assert!(!engine.is_running());

    let runs = gateway.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, SessionStatus::Error);
}
