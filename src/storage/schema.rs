//! Database schema definitions
//!
//! Every table is partitioned by site name so independent site-targets share
//! one database file without colliding. Page rows are keyed by the SHA-256
//! hex digest of their URL.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every processed page, matching or not
CREATE TABLE IF NOT EXISTS page_cache (
    site TEXT NOT NULL,
    id TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    scraped_at TEXT NOT NULL,
    is_match INTEGER NOT NULL DEFAULT 0,
    summary TEXT,
    matched_keyword TEXT,
    PRIMARY KEY (site, id)
);

-- Matching pages only
CREATE TABLE IF NOT EXISTS match_pages (
    site TEXT NOT NULL,
    id TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    scraped_at TEXT NOT NULL,
    summary TEXT,
    matched_keyword TEXT,
    PRIMARY KEY (site, id)
);

CREATE INDEX IF NOT EXISTS idx_match_pages_scraped ON match_pages(site, scraped_at);

-- Run history
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site TEXT NOT NULL,
    mode TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    total_pages_crawled INTEGER NOT NULL,
    new_match_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_site ON runs(site);

-- Per-site settings
CREATE TABLE IF NOT EXISTS settings (
    site TEXT PRIMARY KEY,
    auto_run_enabled INTEGER NOT NULL DEFAULT 0,
    webhook_url TEXT,
    last_auto_run_at TEXT,
    last_manual_run_at TEXT
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
