//! Centralized default constants for the plinth system.
//!
//! **This module is the single source of truth** for shared default
//! values. Crates reference these constants instead of defining their
//! own magic numbers.

// =============================================================================
// CACHING
// =============================================================================

/// Time-to-live for page-cache entries and reference-data snapshots.
/// Past this age an entry is stale and the caller refetches.
pub const CACHE_TTL_SECS: u64 = 300;

/// Debounce window for coalescing change-feed bursts before a refetch.
/// A write touching several related tables in quick succession should
/// trigger one refetch, not one per table.
pub const CHANGE_DEBOUNCE_MS: u64 = 100;

/// Debounce window for search keystrokes.
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for the miniature listing.
pub const PAGE_SIZE: i64 = 25;

// =============================================================================
// CHANGE FEED
// =============================================================================

/// Broadcast buffer capacity for the change bus.
/// Recommended: 256 for production, 32 for tests.
pub const CHANGE_BUS_CAPACITY: usize = 256;

// =============================================================================
// UI POLICY
// =============================================================================

/// Suspensions shorter than this should not flash a loading indicator.
pub const LOADING_INDICATOR_DELAY_MS: u64 = 500;
