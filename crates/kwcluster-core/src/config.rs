use std::time::Duration;

use crate::constants::{
    API_BASE_URL, BULK_FETCH_LIMIT, DEFAULT_CACHE_TTL_MS, DEFAULT_PAGE_SIZE, FILTER_DEBOUNCE_MS,
    POLL_ACTIVE_INTERVAL_MS, POLL_LOCKED_INTERVAL_MS, REQUEST_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub api_base_url: String,
    pub cache_ttl: Duration,
    /// Upper bound on rows pulled by a single bulk request.
    pub bulk_fetch_limit: u32,
    pub default_page_size: u32,
    pub filter_debounce: Duration,
    pub poll_active_interval: Duration,
    pub poll_locked_interval: Duration,
    pub request_timeout: Duration,
}

impl CoreConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            bulk_fetch_limit: BULK_FETCH_LIMIT,
            default_page_size: DEFAULT_PAGE_SIZE,
            filter_debounce: Duration::from_millis(FILTER_DEBOUNCE_MS),
            poll_active_interval: Duration::from_millis(POLL_ACTIVE_INTERVAL_MS),
            poll_locked_interval: Duration::from_millis(POLL_LOCKED_INTERVAL_MS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(API_BASE_URL)
    }
}
