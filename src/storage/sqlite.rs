//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PersistenceGateway trait.

use crate::state::SessionStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PersistenceGateway, StorageError, StorageResult};
use crate::storage::{
    GatewayStats, PageRecord, RunMode, RunRecord, RunSummary, SettingsUpdate, SiteSettings,
    StoredMatch, UpsertOutcome,
};
use crate::url::hash_url;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection sits behind a mutex so one gateway can be shared by every
/// engine of the process.
pub struct SqliteGateway {
    conn: Mutex<Connection>,
}

impl SqliteGateway {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteGateway)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for tests and dry runs)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    // ===== Synchronous operations behind the async trait =====

    fn known_url_hashes_sync(&self, site: &str) -> StorageResult<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM page_cache WHERE site = ?1")?;
        let hashes = stmt
            .query_map(params![site], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(hashes)
    }

    fn upsert_page_sync(&self, site: &str, page: &PageRecord) -> StorageResult<UpsertOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = hash_url(&page.url);
        let scraped_at = page.scraped_at.to_rfc3339();

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM page_cache WHERE site = ?1 AND id = ?2",
                params![site, id],
                |row| row.get(0),
            )
            .optional()?;

        tx.execute(
            "INSERT INTO page_cache
                (site, id, url, title, content, scraped_at, is_match, summary, matched_keyword)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(site, id) DO UPDATE SET
                url = excluded.url,
                title = excluded.title,
                content = excluded.content,
                scraped_at = excluded.scraped_at,
                is_match = excluded.is_match,
                summary = excluded.summary,
                matched_keyword = excluded.matched_keyword",
            params![
                site,
                id,
                page.url,
                page.title,
                page.content_preview,
                scraped_at,
                page.is_match,
                page.summary,
                page.matched_keyword,
            ],
        )?;

        if page.is_match {
            tx.execute(
                "INSERT INTO match_pages
                    (site, id, url, title, content, scraped_at, summary, matched_keyword)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(site, id) DO UPDATE SET
                    url = excluded.url,
                    title = excluded.title,
                    content = excluded.content,
                    scraped_at = excluded.scraped_at,
                    summary = excluded.summary,
                    matched_keyword = excluded.matched_keyword",
                params![
                    site,
                    id,
                    page.url,
                    page.title,
                    page.content_preview,
                    scraped_at,
                    page.summary,
                    page.matched_keyword,
                ],
            )?;
        }

        tx.commit()?;

        Ok(UpsertOutcome {
            is_new: existing.is_none(),
        })
    }

    fn record_run_summary_sync(&self, site: &str, summary: &RunSummary) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let completed_at = summary.completed_at.to_rfc3339();

        tx.execute(
            "INSERT INTO runs
                (site, mode, status, started_at, completed_at, total_pages_crawled, new_match_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                site,
                summary.mode.to_db_string(),
                summary.status.to_db_string(),
                summary.started_at.to_rfc3339(),
                completed_at,
                summary.total_pages_crawled as i64,
                summary.new_match_count as i64,
            ],
        )?;

        ensure_settings_row(&tx, site)?;
        let column = match summary.mode {
            RunMode::Auto => "last_auto_run_at",
            RunMode::Manual => "last_manual_run_at",
        };
        tx.execute(
            &format!("UPDATE settings SET {} = ?1 WHERE site = ?2", column),
            params![completed_at, site],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn settings_sync(&self, site: &str) -> StorageResult<SiteSettings> {
        let conn = self.lock()?;
        read_settings(&conn, site)
    }

    fn update_settings_sync(
        &self,
        site: &str,
        update: SettingsUpdate,
    ) -> StorageResult<SiteSettings> {
        let conn = self.lock()?;
        ensure_settings_row(&conn, site)?;

        if let Some(enabled) = update.auto_run_enabled {
            conn.execute(
                "UPDATE settings SET auto_run_enabled = ?1 WHERE site = ?2",
                params![enabled, site],
            )?;
        }

        if let Some(webhook) = update.webhook_url {
            conn.execute(
                "UPDATE settings SET webhook_url = ?1 WHERE site = ?2",
                params![webhook, site],
            )?;
        }

        read_settings(&conn, site)
    }

    fn clear_all_sync(&self, site: &str) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for table in ["page_cache", "match_pages", "runs"] {
            tx.execute(&format!("DELETE FROM {} WHERE site = ?1", table), params![site])?;
        }

        tx.execute(
            "UPDATE settings SET last_auto_run_at = NULL, last_manual_run_at = NULL
             WHERE site = ?1",
            params![site],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn match_pages_sync(&self, site: &str) -> StorageResult<Vec<StoredMatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT url, title, content, scraped_at, summary, matched_keyword
             FROM match_pages WHERE site = ?1
             ORDER BY scraped_at DESC",
        )?;

        let rows = stmt
            .query_map(params![site], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(url, title, content, scraped_at, summary, matched_keyword)| -> StorageResult<StoredMatch> {
                    Ok(StoredMatch {
                        url,
                        title,
                        content,
                        scraped_at: parse_timestamp(&scraped_at)?,
                        summary,
                        matched_keyword,
                    })
                },
            )
            .collect()
    }

    fn stats_sync(&self, site: &str) -> StorageResult<GatewayStats> {
        let conn = self.lock()?;

        let total_pages: i64 = conn.query_row(
            "SELECT COUNT(*) FROM page_cache WHERE site = ?1",
            params![site],
            |row| row.get(0),
        )?;
        let match_pages: i64 = conn.query_row(
            "SELECT COUNT(*) FROM match_pages WHERE site = ?1",
            params![site],
            |row| row.get(0),
        )?;

        let settings = read_settings(&conn, site)?;
        let last_run_at = settings.last_manual_run_at.max(settings.last_auto_run_at);

        Ok(GatewayStats {
            total_pages: total_pages as u64,
            match_pages: match_pages as u64,
            last_run_at,
        })
    }

    fn recent_runs_sync(&self, site: &str, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, mode, status, started_at, completed_at, total_pages_crawled, new_match_count
             FROM runs WHERE site = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![site, limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, mode, status, started_at, completed_at, total, new)| -> StorageResult<RunRecord> {
                Ok(RunRecord {
                    id,
                    summary: RunSummary {
                        mode: RunMode::from_db_string(&mode).ok_or_else(|| {
                            StorageError::Serialization(format!("unknown run mode '{}'", mode))
                        })?,
                        status: SessionStatus::from_db_string(&status).ok_or_else(|| {
                            StorageError::Serialization(format!("unknown run status '{}'", status))
                        })?,
                        started_at: parse_timestamp(&started_at)?,
                        completed_at: parse_timestamp(&completed_at)?,
                        total_pages_crawled: total as u64,
                        new_match_count: new as u64,
                    },
                })
            })
            .collect()
    }

    fn update_summary_sync(&self, site: &str, url: &str, summary: &str) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = hash_url(url);

        let updated = tx.execute(
            "UPDATE match_pages SET summary = ?1 WHERE site = ?2 AND id = ?3",
            params![summary, site, id],
        )?;
        if updated == 0 {
            return Err(StorageError::PageNotFound(url.to_string()));
        }

        tx.execute(
            "UPDATE page_cache SET summary = ?1 WHERE site = ?2 AND id = ?3",
            params![summary, site, id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn update_matched_keyword_sync(&self, site: &str, url: &str, keyword: &str) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = hash_url(url);

        let updated = tx.execute(
            "UPDATE match_pages SET matched_keyword = ?1 WHERE site = ?2 AND id = ?3",
            params![keyword, site, id],
        )?;
        if updated == 0 {
            return Err(StorageError::PageNotFound(url.to_string()));
        }

        tx.execute(
            "UPDATE page_cache SET matched_keyword = ?1 WHERE site = ?2 AND id = ?3",
            params![keyword, site, id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn remove_match_sync(&self, site: &str, url: &str) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = hash_url(url);

        let removed = tx.execute(
            "DELETE FROM match_pages WHERE site = ?1 AND id = ?2",
            params![site, id],
        )?;
        if removed == 0 {
            return Err(StorageError::PageNotFound(url.to_string()));
        }

        tx.execute(
            "UPDATE page_cache SET is_match = 0, matched_keyword = NULL, summary = NULL
             WHERE site = ?1 AND id = ?2",
            params![site, id],
        )?;

        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn known_url_hashes(&self, site: &str) -> StorageResult<HashSet<String>> {
        self.known_url_hashes_sync(site)
    }

    async fn upsert_page(&self, site: &str, page: &PageRecord) -> StorageResult<UpsertOutcome> {
        self.upsert_page_sync(site, page)
    }

    async fn record_run_summary(&self, site: &str, summary: &RunSummary) -> StorageResult<()> {
        self.record_run_summary_sync(site, summary)
    }

    async fn settings(&self, site: &str) -> StorageResult<SiteSettings> {
        self.settings_sync(site)
    }

    async fn update_settings(
        &self,
        site: &str,
        update: SettingsUpdate,
    ) -> StorageResult<SiteSettings> {
        self.update_settings_sync(site, update)
    }

    async fn clear_all(&self, site: &str) -> StorageResult<()> {
        self.clear_all_sync(site)
    }

    async fn match_pages(&self, site: &str) -> StorageResult<Vec<StoredMatch>> {
        self.match_pages_sync(site)
    }

    async fn stats(&self, site: &str) -> StorageResult<GatewayStats> {
        self.stats_sync(site)
    }

    async fn recent_runs(&self, site: &str, limit: usize) -> StorageResult<Vec<RunRecord>> {
        self.recent_runs_sync(site, limit)
    }

    async fn update_summary(&self, site: &str, url: &str, summary: &str) -> StorageResult<()> {
        self.update_summary_sync(site, url, summary)
    }

    async fn update_matched_keyword(
        &self,
        site: &str,
        url: &str,
        keyword: &str,
    ) -> StorageResult<()> {
        self.update_matched_keyword_sync(site, url, keyword)
    }

    async fn remove_match(&self, site: &str, url: &str) -> StorageResult<()> {
        self.remove_match_sync(site, url)
    }
}

/// Inserts the default settings row for a site if it is missing
fn ensure_settings_row(conn: &Connection, site: &str) -> StorageResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO settings (site, auto_run_enabled) VALUES (?1, 0)",
        params![site],
    )?;
    Ok(())
}

fn read_settings(conn: &Connection, site: &str) -> StorageResult<SiteSettings> {
    let row = conn
        .query_row(
            "SELECT auto_run_enabled, webhook_url, last_auto_run_at, last_manual_run_at
             FROM settings WHERE site = ?1",
            params![site],
            |row| {
                Ok((
                    row.get::<_, bool>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((auto_run_enabled, webhook_url, last_auto, last_manual)) = row else {
        return Ok(SiteSettings::default());
    };

    Ok(SiteSettings {
        auto_run_enabled,
        webhook_url,
        last_auto_run_at: last_auto.as_deref().map(parse_timestamp).transpose()?,
        last_manual_run_at: last_manual.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("invalid timestamp '{}': {}", value, e)))
}
