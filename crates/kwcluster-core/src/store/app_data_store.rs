use parking_lot::RwLock;
use std::sync::Arc;

use crate::models::{ProjectStats, View};
use crate::store::{KeywordRows, KeywordStore, ProjectStore};

/// Client-side data store - single source of truth for keyword views.
/// Filled by fetches, children loads and processing previews.
pub struct AppDataStore {
    pub keywords: KeywordStore,
    pub projects: ProjectStore,
}

/// Store handle shared by the orchestrator, selection engine and poller.
/// Locks are never held across an await point.
pub type SharedStore = Arc<RwLock<AppDataStore>>;

impl AppDataStore {
    pub fn new() -> Self {
        Self {
            keywords: KeywordStore::new(),
            projects: ProjectStore::new(),
        }
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn clear(&mut self) {
        self.keywords.clear();
        self.projects.clear();
    }

    /// Forget everything known about a project: keywords, metadata and stats.
    pub fn remove_project(&mut self, project_id: i64) {
        self.keywords.clear_project_keywords(project_id);
        self.projects.remove_project(project_id);
    }

    pub fn select_keywords_for_view(&self, project_id: i64, view: View) -> KeywordRows {
        self.keywords.select_keywords_for_view(project_id, view)
    }

    pub fn select_children_for_group(&self, project_id: i64, group_id: &str) -> KeywordRows {
        self.keywords.select_children_for_group(project_id, group_id)
    }

    pub fn select_project_stats(&self, project_id: i64) -> Option<&ProjectStats> {
        self.projects.stats(project_id)
    }
}

impl Default for AppDataStore {
    fn default() -> Self {
        Self::new()
    }
}
