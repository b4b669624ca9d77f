//! Structured logging schema and field name constants for plinth.
//!
//! All crates use these constants for consistent structured logging
//! fields, so log aggregation tools can query by standardized names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (best-effort audit/image failures) |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, cache hits/misses, config choices |
//! | TRACE | Per-row iteration, high-volume data |

use tracing_subscriber::EnvFilter;

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "cache", "service", "images", "audit"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "page_cache", "reference_store", "subscriber", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "list", "refresh", "invalidate", "append"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Miniature id being operated on.
pub const MINIATURE_ID: &str = "miniature_id";

/// Table a change notice or query refers to.
pub const DB_TABLE: &str = "db_table";

/// Search term applied to a listing query.
pub const SEARCH: &str = "search";

/// Page number of a listing query.
pub const PAGE: &str = "page";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a query.
pub const RESULT_COUNT: &str = "result_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`; defaults to `info` for plinth crates when the
/// variable is unset. Call once from the embedding application; calling
/// again is a no-op (the second init fails quietly).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,plinth_db=info,plinth_cache=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
