//! Debounced change-feed subscriptions.
//!
//! A subscriber registers interest in a set of tables and hands over an
//! async handler. Bursts of matching notices inside the debounce window
//! collapse into a single handler invocation, so a write that touches
//! several related tables triggers one refetch instead of a storm.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace};

use plinth_core::{ChangeBus, WatchedTable};

/// Async invalidation/refetch callback invoked after each coalesced
/// burst of matching change notices.
pub type ChangeHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Guard for an active subscription.
///
/// Dropping it, or calling [`Subscription::unsubscribe`] (any number of
/// times), stops the feed: the liveness flag is checked immediately
/// before every handler invocation, so a burst already being debounced
/// when the guard is cancelled never fires.
pub struct Subscription {
    alive: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Cancel the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.handle.abort();
    }

    /// Whether the subscription still delivers notifications.
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Subscribe `handler` to changes on `tables`, coalescing bursts within
/// `debounce` into one invocation.
///
/// A lagged receiver (the broadcast buffer overflowed) is treated as a
/// matching event: something changed, we just do not know what, so the
/// safe move is to invalidate.
pub fn subscribe(
    bus: &ChangeBus,
    tables: Vec<WatchedTable>,
    debounce: Duration,
    handler: ChangeHandler,
) -> Subscription {
    let mut rx = bus.subscribe();
    let alive = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&alive);

    let handle = tokio::spawn(async move {
        loop {
            // Wait for the first matching notice.
            let matched = match rx.recv().await {
                Ok(notice) => {
                    trace!(
                        table = notice.change.table.as_str(),
                        op = ?notice.change.op,
                        "change notice received"
                    );
                    tables.contains(&notice.change.table)
                }
                Err(RecvError::Lagged(missed)) => {
                    debug!(
                        subsystem = "cache",
                        component = "subscriber",
                        missed,
                        "change feed lagged, treating as a hit"
                    );
                    true
                }
                Err(RecvError::Closed) => break,
            };
            if !matched {
                continue;
            }

            // Coalesce: drain whatever else arrives inside the window.
            let window = sleep(debounce);
            tokio::pin!(window);
            loop {
                tokio::select! {
                    _ = &mut window => break,
                    more = rx.recv() => match more {
                        Ok(_) | Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                }
            }

            if !flag.load(Ordering::SeqCst) {
                break;
            }
            debug!(
                subsystem = "cache",
                component = "subscriber",
                op = "notify",
                "coalesced change burst, invoking handler"
            );
            handler().await;
            if !flag.load(Ordering::SeqCst) {
                break;
            }
        }
    });

    Subscription { alive, handle }
}
