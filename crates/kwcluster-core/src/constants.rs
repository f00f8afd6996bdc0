//! Application-wide constants
//!
//! Centralized location for cache, paging and polling values
//! that are used across multiple modules.

/// Default REST API base URL
pub const API_BASE_URL: &str = "http://localhost:8000";

/// Default lifetime of a ResultCache entry
pub const DEFAULT_CACHE_TTL_MS: u64 = 30_000;

/// Page size used by the bulk path when pulling a whole view for local filtering.
pub const BULK_FETCH_LIMIT: u32 = 10_000;

pub const DEFAULT_PAGE_SIZE: u32 = 250;

/// Quiet period before a numeric filter edit is sent
pub const FILTER_DEBOUNCE_MS: u64 = 500;

// Processing status polling
pub const POLL_ACTIVE_INTERVAL_MS: u64 = 1_000;
pub const POLL_LOCKED_INTERVAL_MS: u64 = 5_000;

pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Delimiter joining the parts of a ResultCache key
pub const CACHE_KEY_DELIMITER: &str = "-";

/// Fraction of the remaining distance covered per progress tick
pub const PROGRESS_EASING: f64 = 0.1;

/// Below this distance the displayed progress snaps to the target
pub const PROGRESS_SNAP_EPSILON: f64 = 0.5;

/// Sentinel selection ids
pub mod selection {
    /// Select every visible row of the current view (cascades into children)
    pub const SELECT_ALL: i64 = -1;
    /// Clear the selection
    pub const CLEAR_ALL: i64 = 0;
}

pub const PROCESSING_FAILED_MESSAGE: &str = "Processing failed";

/// Cadence at which displayed progress is eased toward its target
pub const PROGRESS_TICK_MS: u64 = 16;
