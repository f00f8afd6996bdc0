//! Mutating keyword operations driven by the current selection.
//!
//! Every action follows the same shape: validate input without touching the
//! network, call the server under a re-entrancy guard, then reconcile by
//! dropping the project's cached pages, force-refreshing the first page of the
//! active view and reloading project stats.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::api::{ActionResult, KeywordApi};
use crate::error::KeywordError;
use crate::fetch::{FetchRequest, KeywordFetchOrchestrator};
use crate::notifications::Notification;
use crate::selection::SelectionEngine;

pub struct KeywordActions {
    fetcher: Arc<KeywordFetchOrchestrator>,
    guard: Mutex<()>,
}

impl KeywordActions {
    pub fn new(fetcher: Arc<KeywordFetchOrchestrator>) -> Self {
        Self {
            fetcher,
            guard: Mutex::new(()),
        }
    }

    /// Group the selection under `group_name`, or under the selection's
    /// suggested name when none is given.
    pub async fn group_selected(
        &self,
        active: &FetchRequest,
        selection: &mut SelectionEngine,
        group_name: Option<&str>,
    ) -> Result<ActionResult, KeywordError> {
        let ids = self.require_selection(selection)?;
        let name = self.require_group_name(group_name, selection)?;
        let _busy = self.acquire("grouping")?;
        let api = self.fetcher.api();
        let result = api.group_keywords(active.project_id, &ids, &name).await;
        self.finish(active, selection, "group", result, |r| {
            format!("Grouped {} keywords as \"{}\"", r.count, name)
        })
        .await
    }

    /// Move the selection into another (possibly new) group.
    pub async fn regroup_selected(
        &self,
        active: &FetchRequest,
        selection: &mut SelectionEngine,
        group_name: Option<&str>,
    ) -> Result<ActionResult, KeywordError> {
        let ids = self.require_selection(selection)?;
        let name = self.require_group_name(group_name, selection)?;
        let _busy = self.acquire("regrouping")?;
        let api = self.fetcher.api();
        let result = api.regroup_keywords(active.project_id, &ids, &name).await;
        self.finish(active, selection, "regroup", result, |r| {
            format!("Regrouped {} keywords into \"{}\"", r.count, name)
        })
        .await
    }

    pub async fn ungroup_selected(
        &self,
        active: &FetchRequest,
        selection: &mut SelectionEngine,
    ) -> Result<ActionResult, KeywordError> {
        self.run_on_selection(active, selection, "ungroup", |api, project_id, ids| async move {
            api.ungroup_keywords(project_id, &ids).await
        })
        .await
    }

    pub async fn confirm_selected(
        &self,
        active: &FetchRequest,
        selection: &mut SelectionEngine,
    ) -> Result<ActionResult, KeywordError> {
        self.run_on_selection(active, selection, "confirm", |api, project_id, ids| async move {
            api.confirm_keywords(project_id, &ids).await
        })
        .await
    }

    pub async fn unconfirm_selected(
        &self,
        active: &FetchRequest,
        selection: &mut SelectionEngine,
    ) -> Result<ActionResult, KeywordError> {
        self.run_on_selection(active, selection, "unconfirm", |api, project_id, ids| async move {
            api.unconfirm_keywords(project_id, &ids).await
        })
        .await
    }

    pub async fn unblock_selected(
        &self,
        active: &FetchRequest,
        selection: &mut SelectionEngine,
    ) -> Result<ActionResult, KeywordError> {
        self.run_on_selection(active, selection, "unblock", |api, project_id, ids| async move {
            api.unblock_keywords(project_id, &ids).await
        })
        .await
    }

    /// Block every keyword containing `token`.
    pub async fn block_token(
        &self,
        active: &FetchRequest,
        selection: &mut SelectionEngine,
        token: &str,
    ) -> Result<ActionResult, KeywordError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(self.reject("Enter a token to block"));
        }
        let _busy = self.acquire("blocking")?;
        let api = self.fetcher.api();
        let result = api.block_token(active.project_id, token).await;
        self.finish(active, selection, "block token", result, |r| {
            format!("Blocked \"{}\" ({} keywords)", token, r.count)
        })
        .await
    }

    async fn run_on_selection<F, Fut>(
        &self,
        active: &FetchRequest,
        selection: &mut SelectionEngine,
        operation: &str,
        call: F,
    ) -> Result<ActionResult, KeywordError>
    where
        F: FnOnce(Arc<dyn KeywordApi>, i64, Vec<i64>) -> Fut,
        Fut: Future<Output = Result<ActionResult, KeywordError>>,
    {
        let ids = self.require_selection(selection)?;
        let _busy = self.acquire(operation)?;
        let result = call(self.fetcher.api(), active.project_id, ids).await;
        self.finish(active, selection, operation, result, |r| {
            format!("{}: {} keywords updated", capitalize(operation), r.count)
        })
        .await
    }

    // ===== Helpers =====

    fn acquire(&self, operation: &str) -> Result<MutexGuard<'_, ()>, KeywordError> {
        self.guard.try_lock().map_err(|_| {
            warn!(operation, "action ignored, another one is running");
            KeywordError::Busy {
                operation: operation.to_string(),
            }
        })
    }

    fn reject(&self, message: &str) -> KeywordError {
        self.fetcher
            .notifications()
            .lock()
            .push(Notification::warning(message));
        KeywordError::invalid_input(message)
    }

    fn require_selection(&self, selection: &SelectionEngine) -> Result<Vec<i64>, KeywordError> {
        if selection.is_empty() {
            return Err(self.reject("Select at least one keyword"));
        }
        Ok(selection.selected_ids().to_vec())
    }

    fn require_group_name(
        &self,
        group_name: Option<&str>,
        selection: &SelectionEngine,
    ) -> Result<String, KeywordError> {
        let name = group_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| selection.group_name_hint().trim());
        if name.is_empty() {
            return Err(self.reject("Could not determine a group name"));
        }
        Ok(name.to_string())
    }

    async fn finish(
        &self,
        active: &FetchRequest,
        selection: &mut SelectionEngine,
        operation: &str,
        result: Result<ActionResult, KeywordError>,
        success_message: impl FnOnce(&ActionResult) -> String,
    ) -> Result<ActionResult, KeywordError> {
        let result = match result {
            Ok(result) => result,
            Err(err) => {
                warn!(project_id = active.project_id, operation, error = %err, "action failed");
                self.fetcher
                    .notifications()
                    .lock()
                    .push(Notification::error(format!(
                        "Failed to {}: {}",
                        operation,
                        err.user_message()
                    )));
                return Err(err);
            }
        };
        info!(project_id = active.project_id, operation, count = result.count, "action applied");

        self.fetcher.invalidate_project(active.project_id);
        // Refresh failures are already reported by the orchestrator.
        let _ = self.fetcher.fetch(&active.refresh_first_page()).await;
        let _ = self.fetcher.refresh_stats(active.project_id).await;

        selection.clear();
        self.fetcher
            .notifications()
            .lock()
            .push(Notification::success(success_message(&result)));
        Ok(result)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
