use std::collections::HashSet;

/// Backing store of the in-run visited set
pub trait VisitedStore: Send {
    /// Inserts a URL, returning true if it was not present
    fn insert(&mut self, url: &str) -> bool;

    fn contains(&self, url: &str) -> bool;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory visited store
#[derive(Debug, Default)]
pub struct MemoryVisitedStore {
    urls: HashSet<String>,
}

impl MemoryVisitedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VisitedStore for MemoryVisitedStore {
    fn insert(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    fn clear(&mut self) {
        self.urls.clear();
    }

    fn len(&self) -> usize {
        self.urls.len()
    }
}

/// URLs already processed during the current run
///
/// Distinct from the persisted known-URL set: this one is cleared at the
/// start of every run.
pub struct VisitedSet {
    store: Box<dyn VisitedStore>,
}

impl VisitedSet {
    pub fn new(store: Box<dyn VisitedStore>) -> Self {
        Self { store }
    }

    /// Marks a URL visited; returns false if it already was
    pub fn mark(&mut self, url: &str) -> bool {
        self.store.insert(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.store.contains(url)
    }

    pub fn reset(&mut self) {
        self.store.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for VisitedSet {
    fn default() -> Self {
        Self::new(Box::new(MemoryVisitedStore::new()))
    }
}

impl std::fmt::Debug for VisitedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisitedSet")
            .field("len", &self.store.len())
            .finish()
    }
}
