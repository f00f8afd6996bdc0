//! Time-bounded result cache for API responses.
//!
//! Keys are plain strings built from `[project, view, page, limit, filters]`
//! joined with `CACHE_KEY_DELIMITER`, which makes project- and view-scoped
//! busting a prefix/substring match. Expired entries are evicted lazily on `get`.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::constants::CACHE_KEY_DELIMITER;
use crate::models::View;

struct CacheEntry {
    value: Box<dyn Any + Send + Sync>,
    expires_at: Instant,
}

/// Session-scoped cache instance; share it with `SharedResultCache`.
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    default_ttl: Duration,
}

pub type SharedResultCache = Arc<Mutex<ResultCache>>;

impl ResultCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    pub fn shared(default_ttl: Duration) -> SharedResultCache {
        Arc::new(Mutex::new(Self::new(default_ttl)))
    }

    /// Returns a clone of the value if present, unexpired and of type `T`.
    pub fn get<T: Clone + 'static>(&mut self, key: &str) -> Option<T> {
        let now = Instant::now();
        let expired = self.entries.get(key)?.expires_at <= now;
        if expired {
            self.entries.remove(key);
            debug!(key, "result cache entry expired");
            return None;
        }
        self.entries.get(key)?.value.downcast_ref::<T>().cloned()
    }

    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries.insert(
            key.into(),
            CacheEntry {
                value: Box::new(value),
                expires_at,
            },
        );
    }

    /// Delete every key containing `pattern`. Returns how many were removed.
    pub fn invalidate(&mut self, pattern: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(pattern));
        before - self.entries.len()
    }

    /// Delete every key that starts with `{project_id}-{view}`.
    pub fn invalidate_by_view(&mut self, project_id: i64, view: View) -> usize {
        let prefix = format!("{}{}{}", project_id, CACHE_KEY_DELIMITER, view.as_str());
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        before - self.entries.len()
    }

    /// Delete every key belonging to the project, across all views.
    pub fn invalidate_project(&mut self, project_id: i64) -> usize {
        let prefix = format!("{}{}", project_id, CACHE_KEY_DELIMITER);
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a page together with its total count.
    ///
    /// Both entries must be fresh; a page without its total is a miss.
    pub fn get_page<T: Clone + 'static>(&mut self, keys: &PageCacheKeys) -> Option<(T, u64)> {
        let total = self.get::<u64>(&keys.total)?;
        let page = self.get::<T>(&keys.page)?;
        Some((page, total))
    }

    /// Store a page and its total count with the same expiry.
    pub fn set_page<T: Send + Sync + 'static>(&mut self, keys: &PageCacheKeys, page: T, total: u64) {
        self.set(keys.total.clone(), total, None);
        self.set(keys.page.clone(), page, None);
    }
}

/// Cache keys describing one fetched page.
///
/// `universe` names the id list of a bulk-filtered result set, shared by
/// every page of the same filters. It expires like any other entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCacheKeys {
    pub page: String,
    pub total: String,
    pub universe: String,
}

impl PageCacheKeys {
    /// `filter_key` is the JSON rendering of everything that shapes the result
    /// other than page and limit.
    pub fn new(project_id: i64, view: View, page: u32, limit: u32, filter_key: &str) -> Self {
        let page_key = [
            project_id.to_string(),
            view.as_str().to_string(),
            page.to_string(),
            limit.to_string(),
            filter_key.to_string(),
        ]
        .join(CACHE_KEY_DELIMITER);
        let scoped = |kind: &str| {
            [
                project_id.to_string(),
                view.as_str().to_string(),
                kind.to_string(),
                filter_key.to_string(),
            ]
            .join(CACHE_KEY_DELIMITER)
        };
        Self {
            page: page_key,
            total: scoped("total"),
            universe: scoped("universe"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> ResultCache {
        ResultCache::new(Duration::from_millis(30_000))
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let mut cache = cache();
        cache.set("k", 5u64, None);
        assert_eq!(cache.get::<u64>("k"), Some(5));

        tokio::time::advance(Duration::from_millis(29_999)).await;
        assert_eq!(cache.get::<u64>("k"), Some(5));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get::<u64>("k"), None);
        // Evicted, not resurrected
        assert!(cache.is_empty());
        assert_eq!(cache.get::<u64>("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ttl() {
        let mut cache = cache();
        cache.set("short", "v".to_string(), Some(Duration::from_millis(10)));
        tokio::time::advance(Duration::from_millis(11)).await;
        assert_eq!(cache.get::<String>("short"), None);
    }

    #[test]
    fn test_wrong_type_is_a_miss() {
        let mut cache = cache();
        cache.set("k", 5u64, None);
        assert_eq!(cache.get::<String>("k"), None);
    }

    #[test]
    fn test_invalidate_by_substring() {
        let mut cache = cache();
        cache.set("1-grouped-1-50-{}", 1u64, None);
        cache.set("1-grouped-total-{}", 1u64, None);
        cache.set("1-ungrouped-1-50-{}", 1u64, None);
        assert_eq!(cache.invalidate("1-grouped-1"), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_by_view_and_project() {
        let mut cache = cache();
        cache.set(PageCacheKeys::new(1, View::Grouped, 1, 50, "{}").page, 1u64, None);
        cache.set(PageCacheKeys::new(1, View::Grouped, 1, 50, "{}").total, 1u64, None);
        cache.set(PageCacheKeys::new(1, View::Blocked, 1, 50, "{}").page, 1u64, None);
        cache.set(PageCacheKeys::new(12, View::Grouped, 1, 50, "{}").page, 1u64, None);

        assert_eq!(cache.invalidate_by_view(1, View::Grouped), 2);
        assert_eq!(cache.invalidate_project(1), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_page_without_total_is_a_miss() {
        let mut cache = cache();
        let keys = PageCacheKeys::new(1, View::Ungrouped, 2, 10, "{}");
        cache.set(keys.page.clone(), vec![1, 2, 3], None);
        assert!(cache.get_page::<Vec<i32>>(&keys).is_none());

        cache.set_page(&keys, vec![1, 2, 3], 23);
        assert_eq!(cache.get_page::<Vec<i32>>(&keys), Some((vec![1, 2, 3], 23)));

        cache.invalidate(&keys.total);
        assert!(cache.get_page::<Vec<i32>>(&keys).is_none());
    }

    #[test]
    fn test_key_layout() {
        let keys = PageCacheKeys::new(3, View::Confirmed, 2, 25, "{\"a\":1}");
        assert_eq!(keys.page, "3-confirmed-2-25-{\"a\":1}");
        assert_eq!(keys.total, "3-confirmed-total-{\"a\":1}");
        assert_eq!(keys.universe, "3-confirmed-universe-{\"a\":1}");
    }
}
