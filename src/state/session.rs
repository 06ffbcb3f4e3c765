/// Run-state definitions for a crawl session
///
/// A session is the point-in-time view pollers read while a run is in progress.
use chrono::{DateTime, Utc};
use std::fmt;

/// Lifecycle state of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// No run has started yet
    #[default]
    Idle,

    /// A run is in progress
    Scraping,

    // ===== Terminal States =====
    /// The queue drained without a stop request
    Completed,

    /// A stop request was honoured before the queue drained
    Stopped,

    /// The run was aborted by a fatal error
    Error,
}

impl SessionStatus {
    /// Returns true if a run is in progress
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Scraping)
    }

    /// Returns true if the run has reached an end state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scraping => "scraping",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "scraping" => Some(Self::Scraping),
            "completed" => Some(Self::Completed),
            "stopped" => Some(Self::Stopped),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Mutable run-state record of one site-target
///
/// Every mutator updates all the fields of one step together, so a reader
/// holding the session lock never sees a counter without its `current_url`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlSession {
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_pages_crawled: u64,
    pub e_invoicing_pages_found: u64,
    pub duplicates_ignored: u64,
    pub current_url: Option<String>,
    pub error_message: Option<String>,
}

impl CrawlSession {
    /// Creates an idle session
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets counters and enters `Scraping`
    pub fn begin(&mut self, started_at: DateTime<Utc>) {
        *self = Self {
            status: SessionStatus::Scraping,
            started_at: Some(started_at),
            ..Self::default()
        };
    }

    /// Shows what the run is currently working on
    pub fn set_current_url(&mut self, url: impl Into<String>) {
        self.current_url = Some(url.into());
    }

    /// Records one processed page
    pub fn record_page(&mut self, url: &str, is_match: bool) {
        self.current_url = Some(url.to_string());
        self.total_pages_crawled += 1;
        if is_match {
            self.e_invoicing_pages_found += 1;
        }
    }

    /// Records a URL skipped because it was already processed in this run
    pub fn record_duplicate(&mut self, url: &str) {
        self.current_url = Some(url.to_string());
        self.duplicates_ignored += 1;
    }

    /// Enters a terminal state
    pub fn finish(&mut self, status: SessionStatus, completed_at: DateTime<Utc>) {
        self.status = status;
        self.completed_at = Some(completed_at);
        self.current_url = None;
    }

    /// Enters `Error` keeping the counters accumulated so far
    pub fn fail(&mut self, message: impl Into<String>, completed_at: DateTime<Utc>) {
        self.error_message = Some(message.into());
        self.finish(SessionStatus::Error, completed_at);
    }

    /// Returns true while a run is in progress
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
