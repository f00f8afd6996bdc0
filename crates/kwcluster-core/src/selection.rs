use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::KeywordApi;
use crate::constants::selection::{CLEAR_ALL, SELECT_ALL};
use crate::models::{Keyword, View};
use crate::store::SharedStore;

/// Tracks which keyword rows are selected and proposes a group name for them.
///
/// Single ids toggle only themselves. `SELECT_ALL` selects every visible row
/// and, in the grouped view, the children of every visible group, fetching
/// children that are not cached yet.
pub struct SelectionEngine {
    api: Arc<dyn KeywordApi>,
    store: SharedStore,
    /// Insertion order; ties in the name hint go to the earlier entry.
    order: Vec<i64>,
    selected: HashSet<i64>,
    group_name_hint: String,
}

impl SelectionEngine {
    pub fn new(api: Arc<dyn KeywordApi>, store: SharedStore) -> Self {
        Self {
            api,
            store,
            order: Vec::new(),
            selected: HashSet::new(),
            group_name_hint: String::new(),
        }
    }

    // ===== Getters =====

    pub fn selected_ids(&self) -> &[i64] {
        &self.order
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn group_name_hint(&self) -> &str {
        &self.group_name_hint
    }

    // ===== Mutations =====

    /// Apply a selection event for a row of `view`.
    pub async fn toggle(&mut self, project_id: i64, view: View, id: i64) {
        match id {
            SELECT_ALL => self.select_all(project_id, view).await,
            CLEAR_ALL => self.clear(),
            _ => {
                if self.selected.remove(&id) {
                    self.order.retain(|selected| *selected != id);
                } else {
                    self.insert(id);
                }
                self.recompute_hint(project_id, view);
            }
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.selected.clear();
        self.group_name_hint.clear();
    }

    fn insert(&mut self, id: i64) -> bool {
        if self.selected.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    /// Select every visible row, plus group children in the grouped view.
    ///
    /// Children fetches run concurrently. A group whose fetch fails keeps its
    /// parent selected without children; the others still complete. The
    /// selection is only updated once every fetch has settled.
    async fn select_all(&mut self, project_id: i64, view: View) {
        let (visible, cached_children, to_fetch) = {
            let store = self.store.read();
            let visible = store.select_keywords_for_view(project_id, view);
            let mut cached_children = Vec::new();
            let mut to_fetch = Vec::new();

            if view == View::Grouped {
                for row in visible.iter().filter(|row| row.is_parent) {
                    let Some(group_id) = row.group_id.as_deref() else {
                        continue;
                    };
                    if store.keywords.has_children_cached(project_id, group_id) {
                        cached_children.extend(
                            store
                                .select_children_for_group(project_id, group_id)
                                .iter()
                                .map(|child| child.id),
                        );
                    } else if row.child_count > 0 {
                        to_fetch.push(group_id.to_string());
                    }
                }
            }
            (visible, cached_children, to_fetch)
        };

        let api = self.api.clone();
        let results = join_all(to_fetch.into_iter().map(|group_id| {
            let api = api.clone();
            async move {
                let result = api.fetch_children_of_group(project_id, &group_id).await;
                (group_id, result)
            }
        }))
        .await;

        let mut fetched_children = Vec::new();
        {
            let mut store = self.store.write();
            for (group_id, result) in results {
                match result {
                    Ok(response) => {
                        let children = store.keywords.merge_incoming(project_id, response.children);
                        fetched_children.extend(children.iter().map(|child| child.id));
                        store
                            .keywords
                            .set_children_for_group(project_id, &group_id, children);
                    }
                    Err(err) => {
                        warn!(
                            project_id,
                            group_id = %group_id,
                            error = %err,
                            "children fetch failed during select all, keeping parent only"
                        );
                    }
                }
            }
        }

        let before = self.order.len();
        for id in visible
            .iter()
            .map(|row| row.id)
            .chain(cached_children)
            .chain(fetched_children)
        {
            self.insert(id);
        }
        debug!(project_id, view = %view, added = self.order.len() - before, "select all");
        self.recompute_hint(project_id, view);
    }

    /// Text of the highest-volume selected row; the first one wins a tie.
    /// In the grouped view a selected child stands for its parent.
    fn recompute_hint(&mut self, project_id: i64, view: View) {
        let store = self.store.read();
        let mut best: Option<Arc<Keyword>> = None;
        for id in &self.order {
            let Some(row) = store.keywords.keyword(project_id, *id) else {
                continue;
            };
            if best.as_ref().map_or(true, |current| row.volume > current.volume) {
                best = Some(row);
            }
        }

        self.group_name_hint = match best {
            None => String::new(),
            Some(row) if view == View::Grouped && row.is_child() => {
                let group_id = row.group_id.as_deref().unwrap_or_default();
                store
                    .keywords
                    .find_parent(project_id, group_id)
                    .map(|parent| parent.text.clone())
                    .or_else(|| row.group_name.clone())
                    .unwrap_or_else(|| row.text.clone())
            }
            Some(row) => row.text.clone(),
        };
    }
}
