//! Cached, search-aware miniature browsing.
//!
//! `MiniatureBrowser` is the read path behind the listing screen: it
//! consults the page cache first, falls back to the repository, and
//! stamps every fetch with a generation counter so a result that was
//! superseded by a newer query is discarded instead of clobbering
//! state. The in-flight request is not cancelled on the wire; only its
//! result is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::sleep;
use tracing::debug;

use plinth_core::defaults::SEARCH_DEBOUNCE_MS;
use plinth_core::{
    ChangeBus, ListMiniaturesRequest, MiniatureOverview, MiniatureRepository, Result, WatchedTable,
};

use crate::page_cache::PageCache;
use crate::subscriber::{subscribe, Subscription};

/// One browsed page, with provenance.
#[derive(Debug, Clone)]
pub struct BrowseResult {
    pub rows: Vec<MiniatureOverview>,
    pub total: i64,
    pub page: u32,
    pub search: String,
    pub from_cache: bool,
}

/// Cached paginated reader over the miniature listing.
pub struct MiniatureBrowser {
    repo: Arc<dyn MiniatureRepository>,
    cache: Arc<PageCache<MiniatureOverview>>,
    page_size: i64,
    generation: AtomicU64,
}

impl MiniatureBrowser {
    pub fn new(
        repo: Arc<dyn MiniatureRepository>,
        cache: Arc<PageCache<MiniatureOverview>>,
        page_size: i64,
    ) -> Self {
        Self {
            repo,
            cache,
            page_size,
            generation: AtomicU64::new(0),
        }
    }

    /// Load one page, serving from cache when fresh.
    ///
    /// Returns `Ok(None)` when a newer `browse` call superseded this
    /// one while its fetch was in flight; the caller should simply drop
    /// the outcome (the newer call's result is the one to render).
    pub async fn browse(&self, page: u32, search: &str) -> Result<Option<BrowseResult>> {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let search = search.trim();

        if let Some(hit) = self.cache.get(page, search) {
            debug!(
                subsystem = "cache",
                component = "browser",
                op = "browse",
                page,
                search,
                "cache hit"
            );
            return Ok(Some(BrowseResult {
                rows: hit.rows,
                total: hit.total,
                page,
                search: search.to_string(),
                from_cache: true,
            }));
        }

        let fetched = self
            .repo
            .list(ListMiniaturesRequest {
                page,
                page_size: self.page_size,
                search: (!search.is_empty()).then(|| search.to_string()),
            })
            .await?;

        if self.generation.load(Ordering::SeqCst) != my_generation {
            debug!(
                subsystem = "cache",
                component = "browser",
                op = "browse",
                page,
                search,
                "result superseded, discarding"
            );
            return Ok(None);
        }

        self.cache
            .put(page, search, fetched.rows.clone(), fetched.total);

        Ok(Some(BrowseResult {
            rows: fetched.rows,
            total: fetched.total,
            page,
            search: search.to_string(),
            from_cache: false,
        }))
    }

    /// Drop all cached pages. The next `browse` refetches.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Wire this browser to the change feed: any miniature write
    /// invalidates the page cache after the debounce window.
    pub fn watch(&self, bus: &ChangeBus, debounce: Duration) -> Subscription {
        let cache = Arc::clone(&self.cache);
        subscribe(
            bus,
            vec![WatchedTable::Miniatures],
            debounce,
            Arc::new(move || {
                let cache = Arc::clone(&cache);
                async move {
                    cache.invalidate();
                }
                .boxed()
            }),
        )
    }
}

/// Keystroke debouncer for the search box.
///
/// Every call supersedes the pending one; only the call still current
/// after the delay should issue a query. The superseded caller gets
/// `false` and does nothing.
pub struct SearchDebouncer {
    delay: Duration,
    sequence: AtomicU64,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            sequence: AtomicU64::new(0),
        }
    }

    /// Debouncer with the default keystroke delay.
    pub fn with_default_delay() -> Self {
        Self::new(Duration::from_millis(SEARCH_DEBOUNCE_MS))
    }

    /// Wait out the debounce window. Returns `true` iff no newer call
    /// arrived in the meantime.
    pub async fn settle(&self) -> bool {
        let my_sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(self.delay).await;
        self.sequence.load(Ordering::SeqCst) == my_sequence
    }
}
