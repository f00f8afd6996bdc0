//! Decides how a page of a keyword view is produced and commits it to the store.
//!
//! Paths are tried in order: result cache, locally cached filtered universe,
//! bulk download with client-side filtering (grouped/confirmed views with
//! active filters), and finally a plain server page query. Nothing is written
//! to the store unless the chosen path succeeds.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{KeywordApi, KeywordQuery};
use crate::cache::{PageCacheKeys, SharedResultCache};
use crate::config::CoreConfig;
use crate::debounce::Debouncer;
use crate::error::KeywordError;
use crate::models::{
    Keyword, KeywordFilters, MatchType, Pagination, Project, ProjectStats, RawKeyword, SortSpec,
    View,
};
use crate::notifications::{Notification, SharedNotifications};
use crate::search::filter_rows;
use crate::stats::SharedFetchStats;
use crate::store::{KeywordRows, KeywordStore, SharedStore};

/// Where a page came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchPath {
    Cache,
    Bulk,
    LocalFiltered,
    Server,
}

impl FetchPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Bulk => "bulk",
            Self::LocalFiltered => "local",
            Self::Server => "server",
        }
    }
}

/// One page request for a view.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub project_id: i64,
    pub view: View,
    pub page: u32,
    pub limit: u32,
    pub sort: SortSpec,
    pub filters: KeywordFilters,
    pub include_match: MatchType,
    pub exclude_match: MatchType,
    pub force_refresh: bool,
}

impl FetchRequest {
    pub fn new(project_id: i64, view: View, limit: u32) -> Self {
        Self {
            project_id,
            view,
            page: 1,
            limit,
            sort: SortSpec::default(),
            filters: KeywordFilters::default(),
            include_match: MatchType::Any,
            exclude_match: MatchType::Any,
            force_refresh: false,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_filters(mut self, filters: KeywordFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn forced(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    /// Same view and filters, first page, bypassing the cache.
    pub fn refresh_first_page(&self) -> Self {
        Self {
            page: 1,
            force_refresh: true,
            ..self.clone()
        }
    }

    /// JSON rendering of everything except page and limit that shapes the result.
    pub fn filter_key(&self) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct FilterKey<'a> {
            filters: &'a KeywordFilters,
            sort: &'a SortSpec,
            include_match_type: MatchType,
            exclude_match_type: MatchType,
        }

        serde_json::to_string(&FilterKey {
            filters: &self.filters,
            sort: &self.sort,
            include_match_type: self.include_match,
            exclude_match_type: self.exclude_match,
        })
        .unwrap_or_default()
    }

    fn cache_keys(&self, filter_key: &str) -> PageCacheKeys {
        PageCacheKeys::new(self.project_id, self.view, self.page, self.limit, filter_key)
    }

    /// Grouped-like views with any active filter are filtered client-side.
    pub fn uses_local_filtering(&self) -> bool {
        self.view.is_grouped_like() && self.filters.is_active()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    pub path: FetchPath,
    pub pagination: Pagination,
}

/// Clears the loading flag when the fetch finishes, whatever the outcome.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Merge API rows with their stored copies and force them into `view`.
pub fn stamp_rows(
    store: &KeywordStore,
    rows: Vec<RawKeyword>,
    project_id: i64,
    view: View,
) -> Vec<Keyword> {
    let mut rows = store.merge_incoming(project_id, rows);
    for row in &mut rows {
        row.stamp_for_view(view);
    }
    rows
}

pub struct KeywordFetchOrchestrator {
    api: Arc<dyn KeywordApi>,
    store: SharedStore,
    cache: SharedResultCache,
    notifications: SharedNotifications,
    stats: SharedFetchStats,
    config: CoreConfig,
    loading: AtomicBool,
    filter_edits: Debouncer,
}

impl KeywordFetchOrchestrator {
    pub fn new(
        api: Arc<dyn KeywordApi>,
        store: SharedStore,
        cache: SharedResultCache,
        notifications: SharedNotifications,
        config: CoreConfig,
    ) -> Self {
        Self {
            api,
            store,
            cache,
            notifications,
            stats: SharedFetchStats::new(),
            filter_edits: Debouncer::new(config.filter_debounce),
            config,
            loading: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> Arc<dyn KeywordApi> {
        self.api.clone()
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn cache(&self) -> &SharedResultCache {
        &self.cache
    }

    pub fn notifications(&self) -> &SharedNotifications {
        &self.notifications
    }

    pub fn stats(&self) -> &SharedFetchStats {
        &self.stats
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Load one page of a view into the store.
    ///
    /// Failures are surfaced as an error notification and returned; the store
    /// keeps its previous contents.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, KeywordError> {
        let _loading = LoadingGuard::new(&self.loading);

        let result = self.fetch_inner(request).await;
        match &result {
            Ok(outcome) => {
                self.stats.record(outcome.path, request.view);
                debug!(
                    project_id = request.project_id,
                    view = %request.view,
                    path = outcome.path.as_str(),
                    page = outcome.pagination.page,
                    total = outcome.pagination.total,
                    "keyword page loaded"
                );
            }
            Err(err) => {
                self.stats.record_failure();
                warn!(
                    project_id = request.project_id,
                    view = %request.view,
                    error = %err,
                    "keyword fetch failed"
                );
                self.notifications.lock().push(Notification::error(format!(
                    "Failed to load {} keywords: {}",
                    request.view,
                    err.user_message()
                )));
            }
        }
        result
    }

    /// Fetch after `filter_debounce` of quiet.
    ///
    /// Meant for free-typed filter fields: each call supersedes the pending one,
    /// so a burst of edits sends only the last request. The handle resolves to
    /// `false` for requests that were superseded.
    pub fn fetch_debounced(self: &Arc<Self>, request: FetchRequest) -> JoinHandle<bool> {
        let orchestrator = Arc::clone(self);
        self.filter_edits.schedule(async move {
            // Failures are reported through notifications by `fetch`.
            let _ = orchestrator.fetch(&request).await;
        })
    }

    /// Drop a pending debounced fetch, e.g. when the view changes.
    pub fn cancel_debounced(&self) {
        self.filter_edits.cancel();
    }

    async fn fetch_inner(&self, request: &FetchRequest) -> Result<FetchOutcome, KeywordError> {
        let filter_key = request.filter_key();
        let keys = request.cache_keys(&filter_key);

        if !request.force_refresh {
            if let Some(outcome) = self.try_cache(request, &keys) {
                return Ok(outcome);
            }
            if request.uses_local_filtering() {
                if let Some(outcome) = self.try_filtered_universe(request, &filter_key, &keys) {
                    return Ok(outcome);
                }
            }
        }

        if request.uses_local_filtering() {
            self.fetch_bulk(request, &filter_key, &keys).await
        } else {
            self.fetch_server_page(request, &keys).await
        }
    }

    fn try_cache(&self, request: &FetchRequest, keys: &PageCacheKeys) -> Option<FetchOutcome> {
        let (rows, total) = self.cache.lock().get_page::<Vec<Keyword>>(keys)?;
        let pagination = Pagination::clamped(total, request.page, request.limit);
        debug!(key = %keys.page, "result cache hit");
        self.commit(request, rows, pagination);
        Some(FetchOutcome {
            path: FetchPath::Cache,
            pagination,
        })
    }

    /// Paginate a filtered result set left behind by an earlier bulk fetch.
    ///
    /// The set is only reused while its id list is fresh in the result cache;
    /// once that expires the next request goes back to the server.
    fn try_filtered_universe(
        &self,
        request: &FetchRequest,
        filter_key: &str,
        keys: &PageCacheKeys,
    ) -> Option<FetchOutcome> {
        let ids = self.cache.lock().get::<Vec<i64>>(&keys.universe)?;
        let universe = {
            let store = self.store.read();
            ids.iter()
                .map(|id| store.keywords.keyword(request.project_id, *id))
                .collect::<Option<Vec<_>>>()?
        };

        let pagination = Pagination::clamped(universe.len() as u64, request.page, request.limit);
        let page: Vec<Keyword> = universe[pagination.window()]
            .iter()
            .map(|row| Keyword::clone(row))
            .collect();

        self.cache.lock().set_page(keys, page.clone(), pagination.total);
        {
            let mut store = self.store.write();
            self.commit_locked(&mut store.keywords, request, page, pagination);
            store
                .keywords
                .set_filtered_ids(request.project_id, request.view, filter_key, ids);
        }
        Some(FetchOutcome {
            path: FetchPath::LocalFiltered,
            pagination,
        })
    }

    /// Pull the whole view once and filter it here.
    async fn fetch_bulk(
        &self,
        request: &FetchRequest,
        filter_key: &str,
        keys: &PageCacheKeys,
    ) -> Result<FetchOutcome, KeywordError> {
        let query = KeywordQuery {
            page: 1,
            limit: self.config.bulk_fetch_limit,
            status: Some(request.view),
            sort: request.sort,
            include_match: request.include_match,
            exclude_match: request.exclude_match,
            filters: KeywordFilters::default(),
        };
        let mut response = self.api.fetch_keywords_page(request.project_id, &query).await?;

        let universe = stamp_rows(
            &self.store.read().keywords,
            response.take_rows(request.view),
            request.project_id,
            request.view,
        );
        if universe.len() as u64 >= self.config.bulk_fetch_limit as u64 {
            warn!(
                project_id = request.project_id,
                view = %request.view,
                limit = self.config.bulk_fetch_limit,
                "bulk fetch hit its row limit, results may be incomplete"
            );
        }

        let filtered = filter_rows(
            &universe,
            &request.filters,
            request.view,
            request.include_match,
            request.exclude_match,
        );
        let pagination = Pagination::clamped(filtered.len() as u64, request.page, request.limit);
        let page = filtered[pagination.window()].to_vec();
        info!(
            project_id = request.project_id,
            view = %request.view,
            fetched = universe.len(),
            matched = filtered.len(),
            "filtered view locally"
        );

        {
            let ids: Vec<i64> = filtered.iter().map(|row| row.id).collect();
            let mut cache = self.cache.lock();
            cache.set_page(keys, page.clone(), pagination.total);
            cache.set(keys.universe.clone(), ids, None);
        }
        {
            let mut store = self.store.write();
            self.commit_locked(&mut store.keywords, request, page, pagination);
            store
                .keywords
                .set_filtered_universe(request.project_id, request.view, filter_key, filtered);
        }
        Ok(FetchOutcome {
            path: FetchPath::Bulk,
            pagination,
        })
    }

    async fn fetch_server_page(
        &self,
        request: &FetchRequest,
        keys: &PageCacheKeys,
    ) -> Result<FetchOutcome, KeywordError> {
        let query = KeywordQuery {
            page: request.page,
            limit: request.limit,
            status: Some(request.view),
            sort: request.sort,
            include_match: request.include_match,
            exclude_match: request.exclude_match,
            filters: request.filters.clone(),
        };
        let mut response = self.api.fetch_keywords_page(request.project_id, &query).await?;

        let rows = stamp_rows(
            &self.store.read().keywords,
            response.take_rows(request.view),
            request.project_id,
            request.view,
        );
        let pagination = match response.pagination {
            Some(server) => Pagination::clamped(server.total, request.page, request.limit),
            None => Pagination::clamped(rows.len() as u64, request.page, request.limit),
        };

        self.cache.lock().set_page(keys, rows.clone(), pagination.total);
        self.commit(request, rows, pagination);
        Ok(FetchOutcome {
            path: FetchPath::Server,
            pagination,
        })
    }

    fn commit(&self, request: &FetchRequest, rows: Vec<Keyword>, pagination: Pagination) {
        let mut store = self.store.write();
        self.commit_locked(&mut store.keywords, request, rows, pagination);
    }

    fn commit_locked(
        &self,
        keywords: &mut KeywordStore,
        request: &FetchRequest,
        rows: Vec<Keyword>,
        pagination: Pagination,
    ) {
        keywords.set_for_view(request.project_id, request.view, rows, Some(pagination.total));
        keywords.set_pagination(request.project_id, request.view, pagination);
    }

    /// Reload the project list; the store keeps it ordered by name.
    pub async fn refresh_projects(&self) -> Result<Vec<Project>, KeywordError> {
        match self.api.fetch_projects().await {
            Ok(projects) => {
                let mut store = self.store.write();
                store.projects.set_projects(projects);
                Ok(store.projects.get_projects().to_vec())
            }
            Err(err) => {
                warn!(error = %err, "project list refresh failed");
                self.notifications.lock().push(Notification::error(format!(
                    "Failed to load projects: {}",
                    err.user_message()
                )));
                Err(err)
            }
        }
    }

    /// Replace the stats of a project with a fresh copy from the server.
    pub async fn refresh_stats(&self, project_id: i64) -> Result<ProjectStats, KeywordError> {
        match self.api.fetch_project_stats(project_id).await {
            Ok(stats) => {
                self.store
                    .write()
                    .projects
                    .set_stats(project_id, stats.clone());
                Ok(stats)
            }
            Err(err) => {
                warn!(project_id, error = %err, "stats refresh failed");
                self.notifications.lock().push(Notification::warning(format!(
                    "Could not refresh project stats: {}",
                    err.user_message()
                )));
                Err(err)
            }
        }
    }

    /// Load the children of a group into the store and return them.
    pub async fn fetch_children(
        &self,
        project_id: i64,
        group_id: &str,
    ) -> Result<KeywordRows, KeywordError> {
        match self.api.fetch_children_of_group(project_id, group_id).await {
            Ok(response) => {
                let mut store = self.store.write();
                let children = store.keywords.merge_incoming(project_id, response.children);
                store
                    .keywords
                    .set_children_for_group(project_id, group_id, children);
                Ok(store.keywords.select_children_for_group(project_id, group_id))
            }
            Err(err) => {
                warn!(project_id, group_id, error = %err, "children fetch failed");
                self.notifications.lock().push(Notification::error(format!(
                    "Failed to load group: {}",
                    err.user_message()
                )));
                Err(err)
            }
        }
    }

    /// Drop every cached page of a project.
    pub fn invalidate_project(&self, project_id: i64) -> usize {
        let removed = self.cache.lock().invalidate_project(project_id);
        debug!(project_id, removed, "project cache invalidated");
        removed
    }

    /// Forget a project entirely: keywords, stats and cached pages.
    pub fn remove_project(&self, project_id: i64) {
        self.store.write().remove_project(project_id);
        self.invalidate_project(project_id);
    }
}
