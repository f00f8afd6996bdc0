use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::constants::PROCESSING_FAILED_MESSAGE;
use crate::fetch::{stamp_rows, FetchRequest, KeywordFetchOrchestrator};
use crate::models::{ProcessingState, ProcessingStatus, View};
use crate::notifications::Notification;
use crate::progress::ProgressSmoother;

/// Delay before the next status check, or `None` when polling should stop.
pub fn next_interval(status: &ProcessingStatus, config: &CoreConfig) -> Option<Duration> {
    match status.status {
        ProcessingState::Complete | ProcessingState::Error => None,
        _ if status.has_active_signal() => Some(config.poll_active_interval),
        _ if status.locked => Some(config.poll_locked_interval),
        _ => None,
    }
}

/// What the poll loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Continue(Duration),
    Stop,
}

/// Follows the import job of one project while a view of it is observed.
pub struct ProcessingStatusPoller {
    fetcher: Arc<KeywordFetchOrchestrator>,
    /// The observed view; refreshed from page 1 when the job completes.
    active: FetchRequest,
    state: Mutex<ProcessingState>,
    last_status: Mutex<Option<ProcessingStatus>>,
    progress: Mutex<ProgressSmoother>,
    in_flight: AtomicBool,
    completion_notified: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ProcessingStatusPoller {
    pub fn new(fetcher: Arc<KeywordFetchOrchestrator>, active: FetchRequest) -> Self {
        Self {
            fetcher,
            active,
            state: Mutex::new(ProcessingState::Idle),
            last_status: Mutex::new(None),
            progress: Mutex::new(ProgressSmoother::new()),
            in_flight: AtomicBool::new(false),
            completion_notified: AtomicBool::new(false),
        }
    }

    pub fn project_id(&self) -> i64 {
        self.active.project_id
    }

    pub fn view(&self) -> View {
        self.active.view
    }

    pub fn state(&self) -> ProcessingState {
        *self.state.lock()
    }

    pub fn last_status(&self) -> Option<ProcessingStatus> {
        self.last_status.lock().clone()
    }

    /// Progress as displayed, after easing toward the server value.
    pub fn displayed_progress(&self) -> f64 {
        self.progress.lock().displayed()
    }

    /// Advance the progress easing by one frame.
    pub fn tick_progress(&self) -> f64 {
        self.progress.lock().tick()
    }

    /// Check the server once and react to the reported state.
    pub async fn tick(&self) -> PollStep {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!(project_id = self.project_id(), "status check already running, skipping");
            return PollStep::Continue(self.fetcher.config().poll_active_interval);
        }
        let _in_flight = InFlightGuard(&self.in_flight);

        let project_id = self.project_id();
        let api = self.fetcher.api();
        let mut status = match api.fetch_processing_status(project_id).await {
            Ok(status) => status,
            Err(err) => {
                warn!(project_id, error = %err, "status check failed");
                self.fetcher
                    .notifications()
                    .lock()
                    .push(Notification::warning(format!(
                        "Could not check processing status: {}",
                        err.user_message()
                    )));
                return PollStep::Continue(self.fetcher.config().poll_active_interval);
            }
        };

        let previous = std::mem::replace(&mut *self.state.lock(), status.status);
        if previous != status.status {
            info!(project_id, from = ?previous, to = ?status.status, "processing state changed");
        }

        let preview = status.keywords.take();
        *self.last_status.lock() = Some(status.clone());

        match status.status {
            ProcessingState::Complete => {
                self.progress.lock().set_target(100.0);
                if previous != ProcessingState::Complete {
                    self.on_complete().await;
                }
                PollStep::Stop
            }
            ProcessingState::Error => {
                self.progress.lock().reset();
                let message = status
                    .message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(PROCESSING_FAILED_MESSAGE)
                    .to_string();
                warn!(project_id, message = %message, "processing failed");
                self.fetcher
                    .notifications()
                    .lock()
                    .push(Notification::error(message));
                PollStep::Stop
            }
            state => {
                self.progress.lock().set_target(status.progress);
                if state.accepts_preview() {
                    if let Some(rows) = preview.filter(|rows| !rows.is_empty()) {
                        let mut store = self.fetcher.store().write();
                        let rows = stamp_rows(&store.keywords, rows, project_id, View::Ungrouped);
                        debug!(project_id, rows = rows.len(), "showing preview rows");
                        store
                            .keywords
                            .set_for_view(project_id, View::Ungrouped, rows, None);
                    }
                }
                match next_interval(&status, self.fetcher.config()) {
                    Some(delay) => PollStep::Continue(delay),
                    None => PollStep::Stop,
                }
            }
        }
    }

    async fn on_complete(&self) {
        let project_id = self.project_id();
        info!(project_id, "processing complete, refreshing view");
        self.fetcher.invalidate_project(project_id);
        let _ = self.fetcher.fetch(&self.active.refresh_first_page()).await;
        let _ = self.fetcher.refresh_stats(project_id).await;

        if !self.completion_notified.swap(true, Ordering::SeqCst) {
            self.fetcher
                .notifications()
                .lock()
                .push(Notification::success("Processing complete"));
        }
    }

    /// Poll in the background until the job settles or the handle goes away.
    pub fn spawn(self: Arc<Self>) -> PollerHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let project_id = self.project_id();
        let view = self.view();

        let task = tokio::spawn(async move {
            loop {
                let step = tokio::select! {
                    _ = cancel_rx.changed() => break,
                    step = self.tick() => step,
                };
                let delay = match step {
                    PollStep::Continue(delay) => delay,
                    PollStep::Stop => break,
                };
                tokio::select! {
                    _ = cancel_rx.changed() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            debug!(project_id = self.project_id(), "poller stopped");
        });

        PollerHandle {
            project_id,
            view,
            cancel: cancel_tx,
            task: Some(task),
        }
    }
}

/// Owns a running poll loop. Cancelling or dropping it stops the loop.
pub struct PollerHandle {
    project_id: i64,
    view: View,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Whether this poller belongs to the given project and view.
    pub fn observes(&self, project_id: i64, view: View) -> bool {
        self.project_id == project_id && self.view == view
    }

    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to end on its own or after `cancel`.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{raw, MockKeywordApi};
    use crate::cache::ResultCache;
    use crate::models::{Pagination, RawKeyword};
    use crate::notifications::{NotificationLevel, NotificationQueue};
    use crate::store::AppDataStore;

    fn status(state: ProcessingState, progress: f64) -> ProcessingStatus {
        ProcessingStatus {
            status: state,
            progress,
            ..Default::default()
        }
    }

    fn setup(view: View) -> (Arc<MockKeywordApi>, Arc<ProcessingStatusPoller>) {
        let api = Arc::new(MockKeywordApi::new());
        let fetcher = Arc::new(KeywordFetchOrchestrator::new(
            api.clone(),
            AppDataStore::shared(),
            ResultCache::shared(Duration::from_secs(30)),
            NotificationQueue::shared(),
            CoreConfig::default(),
        ));
        let poller = Arc::new(ProcessingStatusPoller::new(
            fetcher,
            FetchRequest::new(1, view, 250).with_page(4),
        ));
        (api, poller)
    }

    #[test]
    fn test_next_interval_is_adaptive() {
        let config = CoreConfig::default();

        let active = status(ProcessingState::Processing, 10.0);
        assert_eq!(next_interval(&active, &config), Some(Duration::from_millis(1000)));

        let mut queued_only = status(ProcessingState::Idle, 0.0);
        queued_only.queued_jobs = 1;
        assert_eq!(next_interval(&queued_only, &config), Some(Duration::from_millis(1000)));

        let mut locked = status(ProcessingState::Idle, 0.0);
        locked.locked = true;
        assert_eq!(next_interval(&locked, &config), Some(Duration::from_millis(5000)));

        assert_eq!(next_interval(&status(ProcessingState::Idle, 0.0), &config), None);
        let mut done = status(ProcessingState::Complete, 100.0);
        done.locked = true;
        assert_eq!(next_interval(&done, &config), None);
    }

    #[tokio::test]
    async fn test_preview_rows_fill_ungrouped_view() {
        let (api, poller) = setup(View::Grouped);
        let mut processing = status(ProcessingState::Processing, 40.0);
        let mut preview = raw(7, "seo tools");
        preview.tokens = Some(serde_json::Value::String("seo, tools".to_string()));
        processing.keywords = Some(vec![preview]);
        api.push_status(processing);

        assert_eq!(poller.tick().await, PollStep::Continue(Duration::from_millis(1000)));

        let store = poller.fetcher.store().read();
        assert_eq!(store.keywords.view_ids(1, View::Ungrouped), &[7]);
        let row = store.keywords.keyword(1, 7).unwrap();
        assert_eq!(row.tokens, vec!["seo", "tools"]);
        assert_eq!(poller.state(), ProcessingState::Processing);
    }

    #[tokio::test]
    async fn test_uploading_ignores_preview_rows() {
        let (api, poller) = setup(View::Ungrouped);
        let mut uploading = status(ProcessingState::Uploading, 5.0);
        uploading.keywords = Some(vec![RawKeyword { id: 3, ..Default::default() }]);
        api.push_status(uploading);

        poller.tick().await;
        assert_eq!(poller.fetcher.store().read().keywords.row_count(1), 0);
    }

    #[tokio::test]
    async fn test_complete_refreshes_first_page_once() {
        let (api, poller) = setup(View::Grouped);
        api.set_page(View::Grouped, vec![raw(1, "seo")], Some(Pagination::clamped(1, 1, 250)));
        api.push_status(status(ProcessingState::Processing, 50.0));
        api.push_status(status(ProcessingState::Complete, 100.0));

        assert!(matches!(poller.tick().await, PollStep::Continue(_)));
        assert_eq!(poller.tick().await, PollStep::Stop);
        assert_eq!(poller.tick().await, PollStep::Stop);

        assert_eq!(api.call_count("page:1:grouped"), 1);
        assert_eq!(api.call_count("stats:1"), 1);
        let queries = api.queries();
        assert_eq!(queries[0].page, 1);

        let notifications = poller.fetcher.notifications().lock();
        let successes = notifications
            .iter()
            .filter(|n| n.level == NotificationLevel::Success)
            .count();
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_error_zeroes_progress_and_reports() {
        let (api, poller) = setup(View::Ungrouped);
        api.push_status(status(ProcessingState::Processing, 60.0));
        let mut failed = status(ProcessingState::Error, 60.0);
        failed.message = Some("CSV has no keyword column".to_string());
        api.push_status(failed);

        poller.tick().await;
        for _ in 0..10 {
            poller.tick_progress();
        }
        assert!(poller.displayed_progress() > 0.0);

        assert_eq!(poller.tick().await, PollStep::Stop);
        assert_eq!(poller.displayed_progress(), 0.0);
        let notifications = poller.fetcher.notifications().lock();
        let current = notifications.current().unwrap();
        assert_eq!(current.level, NotificationLevel::Error);
        assert_eq!(current.message, "CSV has no keyword column");
    }

    #[tokio::test]
    async fn test_error_without_message_uses_fallback() {
        let (api, poller) = setup(View::Ungrouped);
        api.push_status(status(ProcessingState::Error, 0.0));

        poller.tick().await;
        let notifications = poller.fetcher.notifications().lock();
        assert_eq!(notifications.current().unwrap().message, PROCESSING_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let (api, poller) = setup(View::Ungrouped);
        poller.in_flight.store(true, Ordering::SeqCst);

        assert!(matches!(poller.tick().await, PollStep::Continue(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_stops_on_completion() {
        let (api, poller) = setup(View::Ungrouped);
        api.push_status(status(ProcessingState::Queued, 0.0));
        api.push_status(status(ProcessingState::Processing, 50.0));
        api.push_status(status(ProcessingState::Complete, 100.0));

        let handle = poller.clone().spawn();
        assert!(handle.observes(1, View::Ungrouped));
        handle.join().await;

        assert_eq!(api.call_count("status:1"), 3);
        assert_eq!(poller.state(), ProcessingState::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let (api, poller) = setup(View::Ungrouped);
        api.push_status(status(ProcessingState::Processing, 10.0));

        let handle = poller.clone().spawn();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        drop(handle);
        let calls = api.call_count("status:1");
        assert!(calls >= 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.call_count("status:1"), calls);
    }
}
