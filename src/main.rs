//! Invoice-Scout main entry point
//!
//! This is the command-line interface for the Invoice-Scout e-invoicing page watcher.

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use invoice_scout::config::{load_config_with_hash, Config, SiteConfig};
use invoice_scout::crawler::{
    build_http_client, trigger_scheduled, CrawlEngine, RunMode, RunOptions, SiteProfile,
    TriggerOutcome,
};
use invoice_scout::matcher::{recheck_matches, KeywordMatcher};
use invoice_scout::notify::{resend_all, Notifier, WebhookNotifier};
use invoice_scout::output::{generate_markdown_summary, load_site_report, print_statistics};
use invoice_scout::storage::{open_gateway, PersistenceGateway, SettingsUpdate};
use invoice_scout::summarize::{backfill_summaries, build_summarizer};
use invoice_scout::ScoutError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Runs shown by --stats
const STATS_RUN_LIMIT: usize = 5;

/// Pause between two summary requests during a backfill
const BACKFILL_DELAY: Duration = Duration::from_secs(1);

/// Invoice-Scout: an e-invoicing page watcher
///
/// Invoice-Scout crawls government websites from their sitemaps, flags pages
/// about e-invoicing, stores them and posts new findings to a chat webhook.
#[derive(Parser, Debug)]
#[command(name = "invoice-scout")]
#[command(version = "1.0.0")]
#[command(about = "Watches government websites for e-invoicing pages", long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .multiple(false)
        .args([
            "auto",
            "dry_run",
            "stats",
            "export_summary",
            "notify_all",
            "backfill_summaries",
            "recheck_matches",
            "reset",
            "set_auto_run",
            "set_webhook",
        ])
))]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Restrict the command to these sites (repeatable)
    #[arg(long = "site", value_name = "NAME")]
    sites: Vec<String>,

    /// Only crawl URLs never stored before
    #[arg(long)]
    only_new: bool,

    /// Crawl these URLs instead of the sitemap (repeatable, needs --site)
    #[arg(long = "url", value_name = "URL", requires = "sites")]
    urls: Vec<String>,

    /// Start an auto run on every site that has auto-run enabled
    #[arg(long)]
    auto: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,

    /// Export stored matches as markdown and exit
    #[arg(long)]
    export_summary: bool,

    /// Send every stored match to the webhook and exit
    #[arg(long)]
    notify_all: bool,

    /// Regenerate summaries of stored matches and exit
    #[arg(long)]
    backfill_summaries: bool,

    /// Re-run the keyword table over stored matches and exit
    #[arg(long)]
    recheck_matches: bool,

    /// Delete stored pages, matches and run history and exit
    #[arg(long)]
    reset: bool,

    /// Enable or disable scheduled runs and exit
    #[arg(long, value_name = "BOOL")]
    set_auto_run: Option<bool>,

    /// Set the webhook URL ("" clears it) and exit
    #[arg(long, value_name = "URL")]
    set_webhook: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let sites = select_sites(&config, &cli.sites)?;

    if cli.dry_run {
        handle_dry_run(&config, &sites);
        return Ok(());
    }

    let gateway: Arc<dyn PersistenceGateway> =
        Arc::new(open_gateway(Path::new(&config.output.database_path))?);

    if cli.stats {
        handle_stats(gateway.as_ref(), &sites).await
    } else if cli.export_summary {
        handle_export_summary(&config, gateway.as_ref(), &sites).await
    } else if cli.notify_all {
        handle_notify_all(&config, gateway.as_ref(), &sites).await
    } else if cli.backfill_summaries {
        handle_backfill(&config, gateway.as_ref(), &sites).await
    } else if cli.recheck_matches {
        handle_recheck(gateway.as_ref(), &sites).await
    } else if cli.reset {
        handle_reset(gateway.as_ref(), &sites).await
    } else if let Some(enabled) = cli.set_auto_run {
        let update = SettingsUpdate {
            auto_run_enabled: Some(enabled),
            ..SettingsUpdate::default()
        };
        handle_settings(gateway.as_ref(), &sites, update).await
    } else if let Some(webhook) = cli.set_webhook {
        let webhook = webhook.trim().to_string();
        let update = SettingsUpdate {
            webhook_url: Some((!webhook.is_empty()).then_some(webhook)),
            ..SettingsUpdate::default()
        };
        handle_settings(gateway.as_ref(), &sites, update).await
    } else {
        let engines = build_engines(&config, &sites, gateway)?;
        if cli.auto {
            handle_auto(engines).await
        } else {
            if !cli.urls.is_empty() && engines.len() != 1 {
                bail!("--url needs exactly one --site");
            }
            let options = RunOptions {
                mode: RunMode::Manual,
                only_new: cli.only_new,
                seed_urls: cli.urls,
            };
            handle_crawl(engines, options).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("invoice_scout=info,warn"),
            1 => EnvFilter::new("invoice_scout=debug,info"),
            2 => EnvFilter::new("invoice_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves `--site` names; no names selects every site
fn select_sites<'a>(config: &'a Config, names: &[String]) -> Result<Vec<&'a SiteConfig>, ScoutError> {
    if names.is_empty() {
        return Ok(config.sites.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            config
                .site(name)
                .ok_or_else(|| ScoutError::UnknownSite(name.clone()))
        })
        .collect()
}

fn build_engines(
    config: &Config,
    sites: &[&SiteConfig],
    gateway: Arc<dyn PersistenceGateway>,
) -> anyhow::Result<Vec<Arc<CrawlEngine>>> {
    let client = build_http_client(&config.crawler)?;
    let summarizer = build_summarizer(config.summarizer.as_ref())?;
    let notifier: Arc<dyn Notifier> =
        Arc::new(WebhookNotifier::new(client.clone(), &config.notification));

    sites
        .iter()
        .map(|site| -> anyhow::Result<Arc<CrawlEngine>> {
            let profile = SiteProfile::from_config(site)?;
            let mut engine = CrawlEngine::new(
                profile,
                config.crawler.clone(),
                client.clone(),
                Arc::clone(&gateway),
            )
            .with_notifier(Arc::clone(&notifier), config.notification.webhook_url.clone());
            if let Some(summarizer) = &summarizer {
                engine = engine.with_summarizer(Arc::clone(summarizer));
            }
            Ok(Arc::new(engine))
        })
        .collect()
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, sites: &[&SiteConfig]) {
    println!("=== Invoice-Scout Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Max body size: {} bytes", config.crawler.max_body_bytes);
    println!("  Max redirects: {}", config.crawler.max_redirects);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nSummarizer:");
    match &config.summarizer {
        Some(s) if s.enabled => println!("  {} via {} (key from ${})", s.model, s.api_url, s.api_key_env),
        _ => println!("  disabled"),
    }

    println!("\nSites ({}):", sites.len());
    for site in sites {
        println!("  - {} [{}]", site.label, site.name);
        println!("    Base: {}", site.base_url);
        println!("    Sitemap: {}", site.sitemap_url);
        println!("    Seed: {}", site.seed_url);
        println!("    Keyword set: {:?}", site.keyword_set);
        println!("    Discovery: {:?}", site.discovery);
        println!("    Widget rules: {}", site.widget_rules.len());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
async fn handle_stats(gateway: &dyn PersistenceGateway, sites: &[&SiteConfig]) -> anyhow::Result<()> {
    for site in sites {
        let report = load_site_report(gateway, &site.name, &site.label, STATS_RUN_LIMIT).await?;
        print_statistics(&report);
    }
    Ok(())
}

/// Handles the --export-summary mode: writes stored matches as markdown
async fn handle_export_summary(
    config: &Config,
    gateway: &dyn PersistenceGateway,
    sites: &[&SiteConfig],
) -> anyhow::Result<()> {
    let mut reports = Vec::with_capacity(sites.len());
    for site in sites {
        reports.push(load_site_report(gateway, &site.name, &site.label, STATS_RUN_LIMIT).await?);
    }

    generate_markdown_summary(&reports, Path::new(&config.output.summary_path))?;
    println!("✓ Summary exported to: {}", config.output.summary_path);
    Ok(())
}

/// Handles the --notify-all mode: resends every stored match
async fn handle_notify_all(
    config: &Config,
    gateway: &dyn PersistenceGateway,
    sites: &[&SiteConfig],
) -> anyhow::Result<()> {
    let client = build_http_client(&config.crawler)?;
    let notifier = WebhookNotifier::new(client, &config.notification);

    for site in sites {
        let sent = resend_all(
            gateway,
            &notifier,
            &site.name,
            &site.label,
            config.notification.webhook_url.as_deref(),
        )
        .await?;
        println!("✓ {}: sent {} matches", site.label, sent);
    }
    Ok(())
}

/// Handles the --backfill-summaries mode
async fn handle_backfill(
    config: &Config,
    gateway: &dyn PersistenceGateway,
    sites: &[&SiteConfig],
) -> anyhow::Result<()> {
    let Some(summarizer) = build_summarizer(config.summarizer.as_ref())? else {
        bail!("No enabled [summarizer] section in the configuration");
    };

    for site in sites {
        let report = backfill_summaries(
            gateway,
            &site.name,
            summarizer.as_ref(),
            config.crawler.summary_input_chars,
            BACKFILL_DELAY,
        )
        .await?;
        println!(
            "✓ {}: {} summaries updated, {} failed",
            site.label, report.updated, report.failed
        );
    }
    Ok(())
}

/// Handles the --recheck-matches mode
async fn handle_recheck(gateway: &dyn PersistenceGateway, sites: &[&SiteConfig]) -> anyhow::Result<()> {
    for site in sites {
        let matcher =
            KeywordMatcher::for_site(site.keyword_set, site.keywords.as_deref(), site.patterns.as_deref())?;
        let report = recheck_matches(gateway, &site.name, &matcher).await?;
        println!(
            "✓ {}: {} unchanged, {} relabeled, {} removed",
            site.label, report.unchanged, report.relabeled, report.removed
        );
    }
    Ok(())
}

/// Handles the --reset mode
async fn handle_reset(gateway: &dyn PersistenceGateway, sites: &[&SiteConfig]) -> anyhow::Result<()> {
    for site in sites {
        gateway.clear_all(&site.name).await?;
        println!("✓ {}: stored data cleared", site.label);
    }
    Ok(())
}

/// Handles --set-auto-run and --set-webhook
async fn handle_settings(
    gateway: &dyn PersistenceGateway,
    sites: &[&SiteConfig],
    update: SettingsUpdate,
) -> anyhow::Result<()> {
    for site in sites {
        let settings = gateway.update_settings(&site.name, update.clone()).await?;
        println!(
            "✓ {}: auto-run {}, webhook {}",
            site.label,
            if settings.auto_run_enabled { "enabled" } else { "disabled" },
            settings.webhook_url.as_deref().unwrap_or("(none)")
        );
    }
    Ok(())
}

/// Handles the --auto mode: one scheduled trigger per site
async fn handle_auto(engines: Vec<Arc<CrawlEngine>>) -> anyhow::Result<()> {
    let mut handles = Vec::new();
    for engine in &engines {
        match trigger_scheduled(engine).await? {
            TriggerOutcome::Started(handle) => handles.push(handle),
            TriggerOutcome::Skipped(reason) => {
                tracing::info!(site = %engine.site(), ?reason, "Scheduled run skipped");
            }
        }
    }

    wait_for_runs(&engines, handles).await;
    Ok(())
}

/// Handles the main crawl operation: every engine runs concurrently
async fn handle_crawl(engines: Vec<Arc<CrawlEngine>>, options: RunOptions) -> anyhow::Result<()> {
    let mut handles = Vec::with_capacity(engines.len());
    for engine in &engines {
        handles.push(engine.start(options.clone())?);
    }

    wait_for_runs(&engines, handles).await;
    Ok(())
}

/// Waits for the runs, turning Ctrl-C into a cooperative stop
async fn wait_for_runs(engines: &[Arc<CrawlEngine>], handles: Vec<tokio::task::JoinHandle<()>>) {
    if handles.is_empty() {
        return;
    }

    let stoppers: Vec<Arc<CrawlEngine>> = engines.to_vec();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current page");
            for engine in &stoppers {
                engine.stop();
            }
        }
    });

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!("Crawl task failed: {}", e);
        }
    }
    signal.abort();

    for engine in engines {
        let session = engine.snapshot();
        println!(
            "{}: {} ({} pages crawled, {} e-invoicing pages, {} duplicates ignored)",
            engine.profile().label,
            session.status,
            session.total_pages_crawled,
            session.e_invoicing_pages_found,
            session.duplicates_ignored
        );
        if let Some(message) = &session.error_message {
            println!("  error: {}", message);
        }
    }
}
