//! Contract of the keyword REST service and its wire types.
//!
//! `KeywordApi` is what the orchestrator, selection engine, action helpers and
//! poller talk to. `HttpKeywordApi` is the production implementation; tests use
//! the scripted mock in `test_support`.

mod http;

pub use http::HttpKeywordApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KeywordError;
use crate::models::{
    KeywordFilters, MatchType, NumericRange, Pagination, ProcessingStatus, Project,
    ProjectStats, RawKeyword, SortSpec, View,
};

pub type ApiResult<T> = Result<T, KeywordError>;

#[async_trait]
pub trait KeywordApi: Send + Sync {
    async fn fetch_projects(&self) -> ApiResult<Vec<Project>>;

    async fn fetch_keywords_page(
        &self,
        project_id: i64,
        query: &KeywordQuery,
    ) -> ApiResult<KeywordPageResponse>;

    async fn fetch_children_of_group(
        &self,
        project_id: i64,
        group_id: &str,
    ) -> ApiResult<ChildrenResponse>;

    async fn fetch_project_stats(&self, project_id: i64) -> ApiResult<ProjectStats>;

    async fn fetch_processing_status(&self, project_id: i64) -> ApiResult<ProcessingStatus>;

    // ===== Mutations =====

    async fn group_keywords(
        &self,
        project_id: i64,
        keyword_ids: &[i64],
        group_name: &str,
    ) -> ApiResult<ActionResult>;

    async fn regroup_keywords(
        &self,
        project_id: i64,
        keyword_ids: &[i64],
        group_name: &str,
    ) -> ApiResult<ActionResult>;

    async fn ungroup_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult>;

    async fn confirm_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult>;

    async fn unconfirm_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult>;

    async fn unblock_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult>;

    async fn block_token(&self, project_id: i64, token: &str) -> ApiResult<ActionResult>;
}

/// Parameters of one keyword page request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordQuery {
    pub page: u32,
    pub limit: u32,
    pub status: Option<View>,
    pub sort: SortSpec,
    pub include_match: MatchType,
    pub exclude_match: MatchType,
    pub filters: KeywordFilters,
}

impl KeywordQuery {
    /// Render as query-string pairs. Unset filters are omitted.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(view) = self.status {
            params.push(("status", view.as_str().to_string()));
        }
        params.push(("sort", self.sort.column.as_str().to_string()));
        params.push(("direction", self.sort.direction.as_str().to_string()));
        params.push(("includeMatchType", self.include_match.as_str().to_string()));
        params.push(("excludeMatchType", self.exclude_match.as_str().to_string()));

        let filters = &self.filters;
        if !filters.tokens.is_empty() {
            params.push(("tokens", filters.tokens.join(",")));
        }
        if !filters.include.trim().is_empty() {
            params.push(("include", filters.include.trim().to_string()));
        }
        if !filters.exclude.trim().is_empty() {
            params.push(("exclude", filters.exclude.trim().to_string()));
        }
        push_range(&mut params, "minVolume", "maxVolume", &filters.volume);
        push_range(&mut params, "minLength", "maxLength", &filters.length);
        push_range(&mut params, "minDifficulty", "maxDifficulty", &filters.difficulty);
        push_range(&mut params, "minRating", "maxRating", &filters.rating);
        if !filters.serp_features.is_empty() {
            params.push(("serpFeatures", filters.serp_features.join(",")));
        }
        params
    }
}

fn push_range(
    params: &mut Vec<(&'static str, String)>,
    min_key: &'static str,
    max_key: &'static str,
    range: &NumericRange,
) {
    if let Some(min) = range.min {
        params.push((min_key, format_number(min)));
    }
    if let Some(max) = range.max {
        params.push((max_key, format_number(max)));
    }
}

// 100.0 -> "100", 0.5 -> "0.5"
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Response of the keyword page endpoint. Rows arrive under a per-view key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeywordPageResponse {
    pub ungrouped_keywords: Option<Vec<RawKeyword>>,
    pub grouped_keywords: Option<Vec<RawKeyword>>,
    pub confirmed_keywords: Option<Vec<RawKeyword>>,
    pub blocked_keywords: Option<Vec<RawKeyword>>,
    pub pagination: Option<Pagination>,
}

impl KeywordPageResponse {
    /// Take the rows of the bucket matching `view`; missing buckets are empty.
    pub fn take_rows(&mut self, view: View) -> Vec<RawKeyword> {
        let bucket = match view {
            View::Ungrouped => &mut self.ungrouped_keywords,
            View::Grouped => &mut self.grouped_keywords,
            View::Confirmed => &mut self.confirmed_keywords,
            View::Blocked => &mut self.blocked_keywords,
        };
        bucket.take().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChildrenResponse {
    pub children: Vec<RawKeyword>,
}

/// Outcome of a mutating call: rows affected and, for grouping, the new group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionResult {
    pub count: u64,
    pub group_id: Option<String>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet, VecDeque};

    pub(crate) fn raw(id: i64, text: &str) -> RawKeyword {
        RawKeyword {
            id,
            text: text.to_string(),
            volume: Some(100.0),
            ..Default::default()
        }
    }

    pub(crate) fn raw_parent(id: i64, text: &str, group_id: &str, child_count: u32) -> RawKeyword {
        RawKeyword {
            is_parent: Some(true),
            group_id: Some(serde_json::Value::String(group_id.to_string())),
            group_name: Some(text.to_string()),
            child_count: Some(child_count),
            ..raw(id, text)
        }
    }

    pub(crate) fn raw_child(id: i64, text: &str, group_id: &str) -> RawKeyword {
        RawKeyword {
            group_id: Some(serde_json::Value::String(group_id.to_string())),
            ..raw(id, text)
        }
    }

    /// In-memory `KeywordApi` with scripted responses and a call log.
    #[derive(Default)]
    pub(crate) struct MockKeywordApi {
        pages: Mutex<HashMap<View, (Vec<RawKeyword>, Option<Pagination>)>>,
        children: Mutex<HashMap<String, Vec<RawKeyword>>>,
        failing_groups: Mutex<HashSet<String>>,
        projects: Mutex<Vec<Project>>,
        stats: Mutex<ProjectStats>,
        statuses: Mutex<VecDeque<ProcessingStatus>>,
        fail_pages: Mutex<bool>,
        fail_actions: Mutex<bool>,
        calls: Mutex<Vec<String>>,
        queries: Mutex<Vec<KeywordQuery>>,
    }

    impl MockKeywordApi {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn set_page(&self, view: View, rows: Vec<RawKeyword>, pagination: Option<Pagination>) {
            self.pages.lock().insert(view, (rows, pagination));
        }

        pub(crate) fn set_children(&self, group_id: &str, rows: Vec<RawKeyword>) {
            self.children.lock().insert(group_id.to_string(), rows);
        }

        pub(crate) fn fail_children(&self, group_id: &str) {
            self.failing_groups.lock().insert(group_id.to_string());
        }

        pub(crate) fn set_projects(&self, projects: Vec<Project>) {
            *self.projects.lock() = projects;
        }

        pub(crate) fn set_stats(&self, stats: ProjectStats) {
            *self.stats.lock() = stats;
        }

        /// Statuses are returned in order; the last one repeats.
        pub(crate) fn push_status(&self, status: ProcessingStatus) {
            self.statuses.lock().push_back(status);
        }

        pub(crate) fn fail_pages(&self, fail: bool) {
            *self.fail_pages.lock() = fail;
        }

        pub(crate) fn fail_actions(&self, fail: bool) {
            *self.fail_actions.lock() = fail;
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        pub(crate) fn call_count(&self, prefix: &str) -> usize {
            self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
        }

        pub(crate) fn queries(&self) -> Vec<KeywordQuery> {
            self.queries.lock().clone()
        }

        fn log(&self, call: String) {
            self.calls.lock().push(call);
        }

        fn action(&self, call: String, count: usize, group_id: Option<String>) -> ApiResult<ActionResult> {
            self.log(call);
            if *self.fail_actions.lock() {
                return Err(KeywordError::Api {
                    status: 500,
                    message: "action failed".to_string(),
                });
            }
            Ok(ActionResult {
                count: count as u64,
                group_id,
            })
        }
    }

    #[async_trait]
    impl KeywordApi for MockKeywordApi {
        async fn fetch_projects(&self) -> ApiResult<Vec<Project>> {
            self.log("projects".to_string());
            Ok(self.projects.lock().clone())
        }

        async fn fetch_keywords_page(
            &self,
            project_id: i64,
            query: &KeywordQuery,
        ) -> ApiResult<KeywordPageResponse> {
            let view = query.status.unwrap_or(View::Ungrouped);
            self.log(format!("page:{}:{}", project_id, view));
            self.queries.lock().push(query.clone());
            if *self.fail_pages.lock() {
                return Err(KeywordError::Network {
                    message: "connection refused".to_string(),
                });
            }

            let (rows, pagination) = self.pages.lock().get(&view).cloned().unwrap_or_default();
            let mut response = KeywordPageResponse {
                pagination,
                ..Default::default()
            };
            match view {
                View::Ungrouped => response.ungrouped_keywords = Some(rows),
                View::Grouped => response.grouped_keywords = Some(rows),
                View::Confirmed => response.confirmed_keywords = Some(rows),
                View::Blocked => response.blocked_keywords = Some(rows),
            }
            Ok(response)
        }

        async fn fetch_children_of_group(
            &self,
            project_id: i64,
            group_id: &str,
        ) -> ApiResult<ChildrenResponse> {
            self.log(format!("children:{}:{}", project_id, group_id));
            if self.failing_groups.lock().contains(group_id) {
                return Err(KeywordError::Network {
                    message: format!("children of {} unavailable", group_id),
                });
            }
            let children = self.children.lock().get(group_id).cloned().unwrap_or_default();
            Ok(ChildrenResponse { children })
        }

        async fn fetch_project_stats(&self, project_id: i64) -> ApiResult<ProjectStats> {
            self.log(format!("stats:{}", project_id));
            Ok(self.stats.lock().clone())
        }

        async fn fetch_processing_status(&self, project_id: i64) -> ApiResult<ProcessingStatus> {
            self.log(format!("status:{}", project_id));
            let mut statuses = self.statuses.lock();
            let status = if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().cloned()
            };
            Ok(status.unwrap_or_default())
        }

        async fn group_keywords(
            &self,
            project_id: i64,
            keyword_ids: &[i64],
            group_name: &str,
        ) -> ApiResult<ActionResult> {
            self.action(
                format!("group:{}:{}", project_id, group_name),
                keyword_ids.len(),
                Some(format!("g-{}", group_name)),
            )
        }

        async fn regroup_keywords(
            &self,
            project_id: i64,
            keyword_ids: &[i64],
            group_name: &str,
        ) -> ApiResult<ActionResult> {
            self.action(
                format!("regroup:{}:{}", project_id, group_name),
                keyword_ids.len(),
                Some(format!("g-{}", group_name)),
            )
        }

        async fn ungroup_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult> {
            self.action(format!("ungroup:{}", project_id), keyword_ids.len(), None)
        }

        async fn confirm_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult> {
            self.action(format!("confirm:{}", project_id), keyword_ids.len(), None)
        }

        async fn unconfirm_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult> {
            self.action(format!("unconfirm:{}", project_id), keyword_ids.len(), None)
        }

        async fn unblock_keywords(&self, project_id: i64, keyword_ids: &[i64]) -> ApiResult<ActionResult> {
            self.action(format!("unblock:{}", project_id), keyword_ids.len(), None)
        }

        async fn block_token(&self, project_id: i64, token: &str) -> ApiResult<ActionResult> {
            self.action(format!("block_token:{}:{}", project_id, token), 1, None)
        }
    }
}
