//! Time-boxed in-memory cache for paginated listings.
//!
//! Entries are keyed by the `(page, search term)` pair that produced
//! them, so switching filters can never serve stale cross-filter data.
//! Invalidation is coarse: any write clears everything. Writes are rare
//! relative to reads and the TTL bounds staleness regardless.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use plinth_core::defaults::CACHE_TTL_SECS;

/// A cached page as handed back to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage<T> {
    pub rows: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub search: String,
}

struct StoredPage<T> {
    rows: Vec<T>,
    total: i64,
    stored_at: Instant,
}

/// Generic page cache with a fixed time-to-live.
///
/// Construct one per listing and share it (`Arc`) between the reader
/// that populates it and the writer that invalidates it. All mutation
/// is a full-entry replacement or a clear-all; nothing is ever edited
/// in place, so a coarse mutex is all the coordination needed.
pub struct PageCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, StoredPage<T>>>,
}

impl<T: Clone> PageCache<T> {
    /// Create a cache with a custom TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Create a cache with the default 5-minute TTL.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(CACHE_TTL_SECS))
    }

    fn key(page: u32, search: &str) -> String {
        format!("{page}:{search}")
    }

    /// Return the entry for `(page, search)` if present and younger
    /// than the TTL. Expired entries are dropped on the way out.
    pub fn get(&self, page: u32, search: &str) -> Option<CachedPage<T>> {
        let key = Self::key(page, search);
        let mut entries = self.entries.lock().expect("page cache mutex poisoned");

        match entries.get(&key) {
            Some(stored) if stored.stored_at.elapsed() < self.ttl => Some(CachedPage {
                rows: stored.rows.clone(),
                total: stored.total,
                page,
                search: search.to_string(),
            }),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store a freshly fetched page under its `(page, search)` key.
    pub fn put(&self, page: u32, search: &str, rows: Vec<T>, total: i64) {
        let mut entries = self.entries.lock().expect("page cache mutex poisoned");
        entries.insert(
            Self::key(page, search),
            StoredPage {
                rows,
                total,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry, regardless of key or age.
    pub fn invalidate(&self) {
        let mut entries = self.entries.lock().expect("page cache mutex poisoned");
        let dropped = entries.len();
        entries.clear();
        debug!(
            subsystem = "cache",
            component = "page_cache",
            op = "invalidate",
            dropped,
            "Cleared page cache"
        );
    }

    /// Number of live (possibly expired) entries. Mostly for tests.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("page cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for PageCache<T> {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_is_served() {
        let cache = PageCache::new(Duration::from_secs(300));
        cache.put(1, "", vec!["a", "b"], 12);

        let hit = cache.get(1, "").unwrap();
        assert_eq!(hit.rows, vec!["a", "b"]);
        assert_eq!(hit.total, 12);
        assert_eq!(hit.page, 1);
        assert_eq!(hit.search, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl() {
        let cache = PageCache::new(Duration::from_secs(300));
        cache.put(1, "", vec!["a"], 1);

        advance(Duration::from_secs(299)).await;
        assert!(cache.get(1, "").is_some());

        advance(Duration::from_secs(1)).await;
        assert!(cache.get(1, "").is_none());
        // the expired entry was dropped, not just hidden
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_terms_never_collide() {
        let cache = PageCache::new(Duration::from_secs(300));
        cache.put(1, "", vec!["all"], 40);

        assert!(cache.get(1, "orc").is_none());
        assert_eq!(cache.get(1, "").unwrap().rows, vec!["all"]);

        cache.put(1, "orc", vec!["orc warrior"], 3);
        assert_eq!(cache.get(1, "orc").unwrap().total, 3);
        assert_eq!(cache.get(1, "").unwrap().total, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pages_are_distinct_keys() {
        let cache = PageCache::new(Duration::from_secs(300));
        cache.put(0, "", vec!["first"], 2);
        cache.put(1, "", vec!["second"], 2);

        assert_eq!(cache.get(0, "").unwrap().rows, vec!["first"]);
        assert_eq!(cache.get(1, "").unwrap().rows, vec!["second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_clears_everything() {
        let cache = PageCache::new(Duration::from_secs(300));
        cache.put(0, "", vec![1], 1);
        cache.put(1, "x", vec![2], 1);
        assert_eq!(cache.len(), 2);

        cache.invalidate();
        assert!(cache.get(0, "").is_none());
        assert!(cache.get(1, "x").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_replaces_existing_entry() {
        let cache = PageCache::new(Duration::from_secs(300));
        cache.put(0, "", vec!["old"], 1);
        advance(Duration::from_secs(200)).await;
        cache.put(0, "", vec!["new"], 1);

        // the replacement restarted the TTL clock
        advance(Duration::from_secs(200)).await;
        assert_eq!(cache.get(0, "").unwrap().rows, vec!["new"]);
    }
}
