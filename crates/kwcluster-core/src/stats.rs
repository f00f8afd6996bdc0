use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::fetch::FetchPath;
use crate::models::View;

/// Counters describing how keyword fetches were served.
#[derive(Debug, Default, Clone)]
pub struct FetchStats {
    /// Counts by path -> view -> count
    pub by_path_view: HashMap<FetchPath, HashMap<View, u64>>,
    pub by_path_total: HashMap<FetchPath, u64>,
    pub failures: u64,
    pub total: u64,
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: FetchPath, view: View) {
        self.total += 1;
        *self.by_path_total.entry(path).or_insert(0) += 1;
        *self
            .by_path_view
            .entry(path)
            .or_default()
            .entry(view)
            .or_insert(0) += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn count(&self, path: FetchPath) -> u64 {
        self.by_path_total.get(&path).copied().unwrap_or(0)
    }

    /// Share of successful fetches answered without a network call.
    pub fn local_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let local = self.count(FetchPath::Cache) + self.count(FetchPath::LocalFiltered);
        local as f64 / self.total as f64
    }
}

/// Thread-safe wrapper for fetch stats
#[derive(Debug, Clone, Default)]
pub struct SharedFetchStats {
    inner: Arc<RwLock<FetchStats>>,
}

impl SharedFetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: FetchPath, view: View) {
        if let Ok(mut stats) = self.inner.write() {
            stats.record(path, view);
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut stats) = self.inner.write() {
            stats.record_failure();
        }
    }

    pub fn snapshot(&self) -> FetchStats {
        self.inner.read().map(|s| s.clone()).unwrap_or_default()
    }
}
