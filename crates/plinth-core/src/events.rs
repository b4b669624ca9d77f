//! Change-feed event types and the broadcast bus that carries them.
//!
//! Writers emit a [`ChangeEvent`] for every row-level mutation they
//! perform; the bus wraps it in a [`ChangeNotice`] envelope (UUIDv7 id,
//! timestamp, optional actor) and broadcasts it. Cache layers subscribe
//! and invalidate on matching tables. Slow receivers that fall behind
//! get a `Lagged` error and miss events; for an invalidation stream a
//! missed notice only means a slightly longer staleness window, still
//! bounded by the cache TTL.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

// ============================================================================
// Change events
// ============================================================================

/// Tables the change feed reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchedTable {
    Miniatures,
    MiniTypes,
    Categories,
    Tags,
    Painters,
    BaseSizes,
    Companies,
    ProductLines,
    ProductSets,
}

impl WatchedTable {
    /// Backend table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchedTable::Miniatures => "miniature",
            WatchedTable::MiniTypes => "mini_type",
            WatchedTable::Categories => "category",
            WatchedTable::Tags => "tag",
            WatchedTable::Painters => "painter",
            WatchedTable::BaseSizes => "base_size",
            WatchedTable::Companies => "company",
            WatchedTable::ProductLines => "product_line",
            WatchedTable::ProductSets => "product_set",
        }
    }

    /// The lookup tables the reference store mirrors. A change on any
    /// of these invalidates the reference snapshot (categories count
    /// because they ride along inside the type taxonomy).
    pub fn reference_tables() -> [WatchedTable; 7] {
        [
            WatchedTable::MiniTypes,
            WatchedTable::Categories,
            WatchedTable::Painters,
            WatchedTable::BaseSizes,
            WatchedTable::Companies,
            WatchedTable::ProductLines,
            WatchedTable::ProductSets,
        ]
    }
}

/// Row-level operation reported by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A single row-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub table: WatchedTable,
    pub op: ChangeOp,
    /// Affected row id, when the writer knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<i64>,
}

impl ChangeEvent {
    pub fn insert(table: WatchedTable, entity_id: i64) -> Self {
        Self {
            table,
            op: ChangeOp::Insert,
            entity_id: Some(entity_id),
        }
    }

    pub fn update(table: WatchedTable, entity_id: i64) -> Self {
        Self {
            table,
            op: ChangeOp::Update,
            entity_id: Some(entity_id),
        }
    }

    pub fn delete(table: WatchedTable, entity_id: i64) -> Self {
        Self {
            table,
            op: ChangeOp::Delete,
            entity_id: Some(entity_id),
        }
    }
}

/// Broadcast envelope around a [`ChangeEvent`].
///
/// The UUIDv7 event id gives notices a stable temporal order; `actor`
/// carries the originating user id when the write was attributed.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeNotice {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub change: ChangeEvent,
}

impl ChangeNotice {
    fn new(change: ChangeEvent, actor: Option<String>) -> Self {
        Self {
            event_id: crate::uuid_utils::new_v7(),
            occurred_at: Utc::now(),
            actor,
            change,
        }
    }
}

// ============================================================================
// Change bus
// ============================================================================

/// Broadcast-based bus distributing change notices to any number of
/// subscribers. Constructed once at application start and injected into
/// writers and cache layers; never a module-level global.
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeNotice>,
}

impl ChangeBus {
    /// Create a new bus with the given buffer capacity.
    ///
    /// Recommended: 256 for production, 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an unattributed change. Dropped silently when nobody listens.
    pub fn emit(&self, change: ChangeEvent) {
        self.emit_notice(ChangeNotice::new(change, None));
    }

    /// Emit a change attributed to a user id.
    pub fn emit_as(&self, change: ChangeEvent, actor: impl Into<String>) {
        self.emit_notice(ChangeNotice::new(change, Some(actor.into())));
    }

    fn emit_notice(&self, notice: ChangeNotice) {
        tracing::debug!(
            table = notice.change.table.as_str(),
            op = ?notice.change.op,
            entity_id = ?notice.change.entity_id,
            subscriber_count = self.tx.receiver_count(),
            "change bus emit"
        );
        let _ = self.tx.send(notice);
    }

    /// Subscribe to the feed. Each subscriber gets its own independent
    /// stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(crate::defaults::CHANGE_BUS_CAPACITY)
    }
}

// ============================================================================
// Tests
// ============================================================================
