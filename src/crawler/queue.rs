//! FIFO crawl queue
//!
//! The queue keeps insertion order and counts the waiting copies of each URL
//! so that link discovery can test membership in constant time.

use crate::url::hash_url;
use std::collections::{HashMap, HashSet, VecDeque};

/// Queue of URLs waiting to be fetched during one run
#[derive(Debug, Default)]
pub struct UrlQueue {
    /// URLs in crawl order
    order: VecDeque<String>,

    /// Number of copies of each URL waiting in `order`
    queued: HashMap<String, usize>,

    /// Upper bound applied to discovered links
    max_size: usize,
}

impl UrlQueue {
    /// Creates an empty queue
    ///
    /// # Arguments
    ///
    /// * `max_size` - Queue length above which discovered links are dropped
    pub fn new(max_size: usize) -> Self {
        Self {
            order: VecDeque::new(),
            queued: HashMap::new(),
            max_size,
        }
    }

    /// Creates a queue from the run's seed list
    ///
    /// Duplicate seeds are kept so that the visited set, not the queue,
    /// accounts for them as duplicates.
    pub fn from_seeds(seeds: Vec<String>, max_size: usize) -> Self {
        let mut queued = HashMap::new();
        for url in &seeds {
            *queued.entry(url.clone()).or_insert(0) += 1;
        }
        Self {
            order: seeds.into(),
            queued,
            max_size,
        }
    }

    /// Appends a discovered URL unless it is already queued or the queue is full
    ///
    /// # Returns
    ///
    /// `true` if the URL was added
    pub fn try_enqueue(&mut self, url: String) -> bool {
        if self.order.len() >= self.max_size || self.queued.contains_key(&url) {
            return false;
        }
        self.queued.insert(url.clone(), 1);
        self.order.push_back(url);
        true
    }

    /// Takes the next URL in FIFO order
    pub fn pop(&mut self) -> Option<String> {
        let url = self.order.pop_front()?;
        if let Some(count) = self.queued.get_mut(&url) {
            *count -= 1;
            if *count == 0 {
                self.queued.remove(&url);
            }
        }
        Some(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.queued.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.order.len() >= self.max_size
    }
}

/// Drops URLs whose hash is already known to the gateway
///
/// Order is preserved.
pub fn filter_known(urls: Vec<String>, known_hashes: &HashSet<String>) -> Vec<String> {
    urls.into_iter()
        .filter(|url| !known_hashes.contains(&hash_url(url)))
        .collect()
}
