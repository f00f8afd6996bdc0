use crate::models::{Project, ProjectStats};
use std::collections::HashMap;

/// Sub-store for the project list and per-project aggregate stats.
pub struct ProjectStore {
    projects: Vec<Project>,
    stats: HashMap<i64, ProjectStats>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self {
            projects: Vec::new(),
            stats: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.projects.clear();
        self.stats.clear();
    }

    // ===== Getters =====

    pub fn get_projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn get_project(&self, id: i64) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn stats(&self, project_id: i64) -> Option<&ProjectStats> {
        self.stats.get(&project_id)
    }

    // ===== Mutations =====

    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
        self.sort();
    }

    /// Insert or rename a project, keeping the list ordered by name.
    pub fn upsert_project(&mut self, project: Project) {
        match self.projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => *existing = project,
            None => self.projects.push(project),
        }
        self.sort();
    }

    pub fn remove_project(&mut self, id: i64) {
        self.projects.retain(|p| p.id != id);
        self.stats.remove(&id);
    }

    /// Replace the stats of a project wholesale.
    pub fn set_stats(&mut self, project_id: i64, stats: ProjectStats) {
        self.stats.insert(project_id, stats);
    }

    fn sort(&mut self) {
        self.projects.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new()
    }
}
