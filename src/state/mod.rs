//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlSession`: The observable run-state record of one site-target
//! - `SessionStatus`: Lifecycle state of a session
//! - `VisitedSet`: URLs processed during the current run, over an injectable store

mod session;
mod visited;

// Re-export main types
pub use session::{CrawlSession, SessionStatus};
pub use visited::{MemoryVisitedStore, VisitedSet, VisitedStore};
