use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace};

use crate::materialize::materialize;
use crate::models::{Keyword, KeywordFilters, KeywordPatch, Pagination, RawKeyword, SortSpec, View};

/// Memoized selector output. Callers may compare results with `Arc::ptr_eq`.
pub type KeywordRows = Arc<[Arc<Keyword>]>;

/// Normalized keyword state of a single project.
///
/// Every row lives once in `by_id`; views, group children and derived caches
/// only hold ids and are resolved against `by_id` at read time.
struct ProjectKeywords {
    by_id: HashMap<i64, Arc<Keyword>>,
    view_ids: HashMap<View, Vec<i64>>,
    children_by_group_id: HashMap<String, Vec<i64>>,
    /// view -> sort key -> ordered ids
    sorted_cache: HashMap<View, HashMap<String, Vec<i64>>>,
    /// view -> filter key -> ordered ids
    filtered_cache: HashMap<View, HashMap<String, Vec<i64>>>,
    view_memo: HashMap<View, OnceLock<KeywordRows>>,
    children_memo: HashMap<String, OnceLock<KeywordRows>>,
}

impl ProjectKeywords {
    fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            view_ids: HashMap::new(),
            children_by_group_id: HashMap::new(),
            sorted_cache: HashMap::new(),
            filtered_cache: HashMap::new(),
            view_memo: View::ALL.iter().map(|v| (*v, OnceLock::new())).collect(),
            children_memo: HashMap::new(),
        }
    }

    fn upsert(&mut self, row: Keyword) {
        self.by_id.insert(row.id, Arc::new(row));
    }

    fn resolve(&self, ids: &[i64]) -> Vec<Arc<Keyword>> {
        ids.iter().filter_map(|id| self.by_id.get(id).cloned()).collect()
    }

    fn reset_view_memo(&mut self, view: View) {
        if let Some(memo) = self.view_memo.get_mut(&view) {
            memo.take();
        }
    }

    /// Drop memoized selector output that references any of `ids`.
    fn reset_memos_touching(&mut self, ids: &HashSet<i64>) {
        for view in View::ALL {
            let touched = self
                .view_ids
                .get(&view)
                .is_some_and(|list| list.iter().any(|id| ids.contains(id)));
            if touched {
                self.reset_view_memo(view);
            }
        }
        for (group_id, list) in &self.children_by_group_id {
            if list.iter().any(|id| ids.contains(id)) {
                if let Some(memo) = self.children_memo.get_mut(group_id) {
                    memo.take();
                }
            }
        }
    }

    fn clear_derived_caches(&mut self) {
        self.sorted_cache.clear();
        self.filtered_cache.clear();
    }
}

/// Per-project metadata kept next to the keyword state.
#[derive(Debug, Default, Clone)]
struct ProjectMeta {
    /// `{view}Count` -> total rows reported by the server
    counts: HashMap<String, u64>,
    pagination: HashMap<View, Pagination>,
}

/// Sub-store for normalized keyword rows, per project.
///
/// Operations on an unknown project create an empty sub-state instead of failing.
pub struct KeywordStore {
    projects: HashMap<i64, ProjectKeywords>,
    meta: HashMap<i64, ProjectMeta>,
    empty: KeywordRows,
}

impl KeywordStore {
    pub fn new() -> Self {
        Self {
            projects: HashMap::new(),
            meta: HashMap::new(),
            empty: Arc::from(Vec::new()),
        }
    }

    pub fn clear(&mut self) {
        self.projects.clear();
        self.meta.clear();
    }

    fn ensure(&mut self, project_id: i64) -> &mut ProjectKeywords {
        self.projects
            .entry(project_id)
            .or_insert_with(ProjectKeywords::new)
    }

    // ===== Mutations =====

    /// Replace the contents of `view` with `keywords`, in the given order.
    ///
    /// Rows are upserted into `by_id` (last write wins per id; build partial API
    /// rows with `merge_incoming` first so absent fields survive) and forced into
    /// `view`; their ids leave every other view list. Derived caches of the view
    /// are dropped.
    pub fn set_for_view(
        &mut self,
        project_id: i64,
        view: View,
        keywords: Vec<Keyword>,
        total_count: Option<u64>,
    ) {
        let state = self.ensure(project_id);

        let mut seen = HashSet::with_capacity(keywords.len());
        let mut ids = Vec::with_capacity(keywords.len());
        for mut row in keywords {
            row.status = view;
            if seen.insert(row.id) {
                ids.push(row.id);
            }
            state.upsert(row);
        }

        state.reset_memos_touching(&seen);
        for other in View::ALL.into_iter().filter(|v| *v != view) {
            if let Some(list) = state.view_ids.get_mut(&other) {
                let before = list.len();
                list.retain(|id| !seen.contains(id));
                if list.len() != before {
                    trace!(project_id, view = %other, moved = before - list.len(), "rows left view");
                }
            }
        }

        state.view_ids.insert(view, ids);
        state.reset_view_memo(view);
        state.sorted_cache.remove(&view);
        state.filtered_cache.remove(&view);

        if let Some(total) = total_count {
            self.meta
                .entry(project_id)
                .or_default()
                .counts
                .insert(view.count_key(), total);
        }
    }

    /// Store the children of a group. View lists are not touched.
    pub fn set_children_for_group(&mut self, project_id: i64, group_id: &str, children: Vec<Keyword>) {
        let state = self.ensure(project_id);

        let mut seen = HashSet::with_capacity(children.len());
        let mut ids = Vec::with_capacity(children.len());
        for row in children {
            if seen.insert(row.id) {
                ids.push(row.id);
            }
            state.upsert(row);
        }

        state.reset_memos_touching(&seen);
        state.children_by_group_id.insert(group_id.to_string(), ids);
        state
            .children_memo
            .insert(group_id.to_string(), OnceLock::new());
    }

    /// Shallow-merge `patch` into an existing row.
    ///
    /// Returns false when the id is unknown. Every sorted/filtered cache of the
    /// project is dropped because their id lists were computed from old contents.
    pub fn update_keyword(&mut self, project_id: i64, patch: &KeywordPatch) -> bool {
        let state = self.ensure(project_id);
        let Some(row) = state.by_id.get_mut(&patch.id) else {
            return false;
        };
        patch.apply_to(Arc::make_mut(row));

        state.clear_derived_caches();
        state.reset_memos_touching(&HashSet::from([patch.id]));
        debug!(project_id, keyword_id = patch.id, "keyword updated, derived caches cleared");
        true
    }

    /// Drop the whole keyword sub-state and metadata of a project.
    pub fn clear_project_keywords(&mut self, project_id: i64) {
        self.projects.remove(&project_id);
        self.meta.remove(&project_id);
    }

    pub fn set_pagination(&mut self, project_id: i64, view: View, pagination: Pagination) {
        self.meta
            .entry(project_id)
            .or_default()
            .pagination
            .insert(view, pagination);
    }

    pub fn set_filtered_ids(&mut self, project_id: i64, view: View, filter_key: &str, ids: Vec<i64>) {
        self.ensure(project_id)
            .filtered_cache
            .entry(view)
            .or_default()
            .insert(filter_key.to_string(), ids);
    }

    /// Record a locally filtered result set of `view` under `filter_key`.
    ///
    /// Rows are upserted and their ids leave the other view lists, like
    /// `set_for_view`, but the displayed page of `view` is left alone.
    pub fn set_filtered_universe(
        &mut self,
        project_id: i64,
        view: View,
        filter_key: &str,
        rows: Vec<Keyword>,
    ) {
        let state = self.ensure(project_id);
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let id_set: HashSet<i64> = ids.iter().copied().collect();

        state.reset_memos_touching(&id_set);
        for other in View::ALL.into_iter().filter(|v| *v != view) {
            if let Some(list) = state.view_ids.get_mut(&other) {
                list.retain(|id| !id_set.contains(id));
            }
        }
        for mut row in rows {
            row.status = view;
            state.upsert(row);
        }
        state
            .filtered_cache
            .entry(view)
            .or_default()
            .insert(filter_key.to_string(), ids);
    }

    /// Rows of `view` re-sorted locally. The id order is memoized per sort key
    /// until the view is replaced or any row of the project is updated.
    pub fn sorted_view(&mut self, project_id: i64, view: View, sort: SortSpec) -> Vec<Arc<Keyword>> {
        let key = sort.cache_key();
        let state = self.ensure(project_id);

        if let Some(ids) = state.sorted_cache.get(&view).and_then(|m| m.get(&key)) {
            return state.resolve(ids);
        }

        let ids = state.view_ids.get(&view).cloned().unwrap_or_default();
        let mut rows = state.resolve(&ids);
        rows.sort_by(|a, b| sort.compare(a, b));
        let sorted_ids = rows.iter().map(|r| r.id).collect();
        state
            .sorted_cache
            .entry(view)
            .or_default()
            .insert(key, sorted_ids);
        rows
    }

    // ===== Selectors =====

    pub fn select_keywords_for_view(&self, project_id: i64, view: View) -> KeywordRows {
        let Some(state) = self.projects.get(&project_id) else {
            return self.empty.clone();
        };
        let Some(memo) = state.view_memo.get(&view) else {
            return self.empty.clone();
        };
        memo.get_or_init(|| {
            let ids = state.view_ids.get(&view).map(Vec::as_slice).unwrap_or(&[]);
            Arc::from(state.resolve(ids))
        })
        .clone()
    }

    pub fn select_children_for_group(&self, project_id: i64, group_id: &str) -> KeywordRows {
        let Some(state) = self.projects.get(&project_id) else {
            return self.empty.clone();
        };
        let (Some(ids), Some(memo)) = (
            state.children_by_group_id.get(group_id),
            state.children_memo.get(group_id),
        ) else {
            return self.empty.clone();
        };
        memo.get_or_init(|| Arc::from(state.resolve(ids))).clone()
    }

    pub fn has_children_cached(&self, project_id: i64, group_id: &str) -> bool {
        self.projects
            .get(&project_id)
            .is_some_and(|s| s.children_by_group_id.contains_key(group_id))
    }

    pub fn keyword(&self, project_id: i64, id: i64) -> Option<Arc<Keyword>> {
        self.projects.get(&project_id)?.by_id.get(&id).cloned()
    }

    /// Resolve API rows against the stored copies of the same ids.
    ///
    /// Known ids keep every field the payload omits; unknown ids become new rows.
    /// Nothing is written; pass the result to `set_for_view` or
    /// `set_children_for_group`.
    pub fn merge_incoming(&self, project_id: i64, rows: Vec<RawKeyword>) -> Vec<Keyword> {
        rows.into_iter()
            .map(|raw| match self.keyword(project_id, raw.id) {
                Some(existing) => raw.merge_into(&existing),
                None => raw.into_keyword(project_id),
            })
            .collect()
    }

    pub fn view_ids(&self, project_id: i64, view: View) -> &[i64] {
        self.projects
            .get(&project_id)
            .and_then(|s| s.view_ids.get(&view))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn row_count(&self, project_id: i64) -> usize {
        self.projects.get(&project_id).map_or(0, |s| s.by_id.len())
    }

    /// The parent row of a group, if it has been loaded.
    pub fn find_parent(&self, project_id: i64, group_id: &str) -> Option<Arc<Keyword>> {
        let state = self.projects.get(&project_id)?;
        state
            .by_id
            .values()
            .filter(|row| row.is_parent && row.group_id.as_deref() == Some(group_id))
            .min_by_key(|row| row.id)
            .cloned()
    }

    pub fn filtered_rows(&self, project_id: i64, view: View, filter_key: &str) -> Option<Vec<Arc<Keyword>>> {
        let state = self.projects.get(&project_id)?;
        let ids = state.filtered_cache.get(&view)?.get(filter_key)?;
        Some(state.resolve(ids))
    }

    /// Number of sorted + filtered cache entries held for a project.
    pub fn derived_cache_len(&self, project_id: i64) -> usize {
        self.projects.get(&project_id).map_or(0, |s| {
            s.sorted_cache.values().map(HashMap::len).sum::<usize>()
                + s.filtered_cache.values().map(HashMap::len).sum::<usize>()
        })
    }

    pub fn view_count(&self, project_id: i64, view: View) -> Option<u64> {
        self.meta.get(&project_id)?.counts.get(&view.count_key()).copied()
    }

    pub fn pagination(&self, project_id: i64, view: View) -> Option<Pagination> {
        self.meta.get(&project_id)?.pagination.get(&view).copied()
    }

    /// Displayable rows of a view with group header synthesis applied.
    pub fn materialized_view(&self, project_id: i64, view: View, filters: &KeywordFilters) -> Vec<Keyword> {
        let rows: Vec<Keyword> = self
            .select_keywords_for_view(project_id, view)
            .iter()
            .map(|row| Keyword::clone(row))
            .collect();
        materialize(view, &rows, &filters.include, &filters.exclude)
    }
}

impl Default for KeywordStore {
    fn default() -> Self {
        Self::new()
    }
}
