//! Shared cache of the lookup tables backing miniature forms.
//!
//! One `ReferenceStore` is constructed at application start and handed
//! (via `Arc`) to every consumer; there is no module-level global, so
//! tests can build a fresh instance per case. Loads are single-flight:
//! callers that arrive while a refresh is in progress await that
//! refresh instead of issuing their own fan-out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, info};

use plinth_core::defaults::CACHE_TTL_SECS;
use plinth_core::{
    BaseSize, CatalogRepository, ChangeBus, Company, LookupRepository, Painter, ProductLine,
    ProductSet, Result, TypeRepository, TypeWithCategories, WatchedTable,
};

use crate::subscriber::{subscribe, Subscription};

/// One consistent snapshot of all six reference datasets.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub painters: Vec<Painter>,
    pub base_sizes: Vec<BaseSize>,
    pub companies: Vec<Company>,
    pub product_lines: Vec<ProductLine>,
    pub product_sets: Vec<ProductSet>,
    pub types: Vec<TypeWithCategories>,
}

struct Snapshot {
    data: Arc<ReferenceData>,
    fetched_at: Instant,
}

/// Single-flight, TTL-bounded store for reference data.
pub struct ReferenceStore {
    lookups: Arc<dyn LookupRepository>,
    catalog: Arc<dyn CatalogRepository>,
    types: Arc<dyn TypeRepository>,
    ttl: Duration,
    /// Holding this lock across the fetch is what makes loads
    /// single-flight: the second caller blocks, then finds a fresh
    /// snapshot and returns it without fetching.
    state: tokio::sync::Mutex<Option<Snapshot>>,
    stale: Arc<AtomicBool>,
}

impl ReferenceStore {
    pub fn new(
        lookups: Arc<dyn LookupRepository>,
        catalog: Arc<dyn CatalogRepository>,
        types: Arc<dyn TypeRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            lookups,
            catalog,
            types,
            ttl,
            state: tokio::sync::Mutex::new(None),
            stale: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Store with the default 5-minute TTL.
    pub fn with_default_ttl(
        lookups: Arc<dyn LookupRepository>,
        catalog: Arc<dyn CatalogRepository>,
        types: Arc<dyn TypeRepository>,
    ) -> Self {
        Self::new(lookups, catalog, types, Duration::from_secs(CACHE_TTL_SECS))
    }

    /// Return the current snapshot, refreshing it first when it is
    /// missing, expired, or explicitly invalidated.
    ///
    /// A failed refresh keeps the previous snapshot intact and leaves
    /// the store marked stale, so the next call retries; the error is
    /// returned to the caller either way.
    pub async fn load(&self) -> Result<Arc<ReferenceData>> {
        let mut guard = self.state.lock().await;

        let stale = self.stale.swap(false, Ordering::SeqCst);
        if let Some(snapshot) = guard.as_ref() {
            if !stale && snapshot.fetched_at.elapsed() < self.ttl {
                debug!(
                    subsystem = "cache",
                    component = "reference_store",
                    op = "load",
                    "Reference snapshot served from cache"
                );
                return Ok(Arc::clone(&snapshot.data));
            }
        }

        match self.fetch_all().await {
            Ok(data) => {
                let data = Arc::new(data);
                *guard = Some(Snapshot {
                    data: Arc::clone(&data),
                    fetched_at: Instant::now(),
                });
                info!(
                    subsystem = "cache",
                    component = "reference_store",
                    op = "refresh",
                    painters = data.painters.len(),
                    types = data.types.len(),
                    companies = data.companies.len(),
                    "Reference data refreshed"
                );
                Ok(data)
            }
            Err(e) => {
                // Previous contents stay visible; retry on next load.
                self.stale.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Mark the snapshot stale so the next `load` refetches. Safe to
    /// call from change-feed handlers and after writes.
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::SeqCst);
        debug!(
            subsystem = "cache",
            component = "reference_store",
            op = "invalidate",
            "Reference snapshot invalidated"
        );
    }

    /// Wire this store to the change feed: a write on any watched
    /// lookup table marks the snapshot stale after the debounce window.
    pub fn watch(&self, bus: &ChangeBus, debounce: Duration) -> Subscription {
        let stale = Arc::clone(&self.stale);
        subscribe(
            bus,
            WatchedTable::reference_tables().to_vec(),
            debounce,
            Arc::new(move || {
                let stale = Arc::clone(&stale);
                async move {
                    stale.store(true, Ordering::SeqCst);
                }
                .boxed()
            }),
        )
    }

    /// Fetch all six datasets concurrently. Any single failure aborts
    /// the whole refresh so the snapshot is never a mixed generation.
    async fn fetch_all(&self) -> Result<ReferenceData> {
        let (painters, base_sizes, companies, product_lines, product_sets, types) = tokio::try_join!(
            self.lookups.list_painters(),
            self.lookups.list_base_sizes(),
            self.catalog.list_companies(),
            self.catalog.list_product_lines(),
            self.catalog.list_product_sets(),
            self.types.list_with_categories(),
        )?;

        Ok(ReferenceData {
            painters,
            base_sizes,
            companies,
            product_lines,
            product_sets,
            types,
        })
    }
}
