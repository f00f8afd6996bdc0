// Transient user-facing messages raised by fetches, actions and the poller.
// The presentation layer drains this queue; nothing here renders.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Ordered by importance; an `Error` outranks everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    fn default_duration(self) -> Duration {
        match self {
            Self::Info | Self::Success => Duration::from_secs(3),
            Self::Warning => Duration::from_secs(4),
            Self::Error => Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub duration: Duration,
    pub shown_at: Option<Instant>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            duration: level.default_duration(),
            shown_at: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at
            .is_some_and(|shown| shown.elapsed() >= self.duration)
    }

    fn same_as(&self, other: &Notification) -> bool {
        self.level == other.level && self.message == other.message
    }
}

/// Pending messages plus the one currently on display.
///
/// The current slot always holds the most important message seen since it
/// was last cleared. A more important arrival takes the slot and the
/// preempted message goes back to the queue, so draining loses nothing.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: VecDeque<Notification>,
    current: Option<Notification>,
}

pub type SharedNotifications = Arc<Mutex<NotificationQueue>>;

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedNotifications {
        Arc::new(Mutex::new(Self::new()))
    }

    // ===== Getters =====

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// Current first, then pending in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.current.iter().chain(self.pending.iter())
    }

    pub fn len(&self) -> usize {
        self.pending.len() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    // ===== Mutations =====

    /// Add a message. Repeating the message on display is a no-op, which keeps
    /// a retrying poller from flooding the queue.
    pub fn push(&mut self, notification: Notification) {
        if self.current.as_ref().is_some_and(|c| c.same_as(&notification)) {
            return;
        }

        let preempts = self
            .current
            .as_ref()
            .map_or(true, |current| notification.level > current.level);
        if preempts {
            if let Some(mut displaced) = self.current.take() {
                displaced.shown_at = None;
                self.enqueue(displaced);
            }
            self.show(notification);
        } else {
            self.enqueue(notification);
        }
    }

    pub fn dismiss(&mut self) {
        self.current = None;
        self.advance();
    }

    /// Expire the current message once its duration has elapsed.
    pub fn tick(&mut self) {
        if self.current.as_ref().is_some_and(Notification::is_expired) {
            self.dismiss();
        }
    }

    /// Remove and return every message, current first.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut drained: Vec<Notification> = self.current.take().into_iter().collect();
        drained.extend(self.pending.drain(..));
        drained
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.pending.clear();
    }

    fn enqueue(&mut self, notification: Notification) {
        // Stable within a level: later arrivals of the same level go last.
        let pos = self
            .pending
            .iter()
            .position(|n| n.level < notification.level)
            .unwrap_or(self.pending.len());
        self.pending.insert(pos, notification);
    }

    fn show(&mut self, mut notification: Notification) {
        notification.shown_at.get_or_insert_with(Instant::now);
        self.current = Some(notification);
    }

    fn advance(&mut self) {
        if self.current.is_none() {
            if let Some(next) = self.pending.pop_front() {
                self.show(next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(q: &NotificationQueue) -> Vec<&str> {
        q.iter().map(|n| n.message.as_str()).collect()
    }

    #[test]
    fn test_first_push_is_shown() {
        let mut q = NotificationQueue::new();
        assert!(q.is_empty());

        q.push(Notification::info("Loaded 250 keywords"));
        let current = q.current().unwrap();
        assert_eq!(current.message, "Loaded 250 keywords");
        assert!(current.shown_at.is_some());
        assert_eq!(current.duration, Duration::from_secs(3));

        q.dismiss();
        assert!(q.is_empty());
    }

    #[test]
    fn test_error_preempts_and_keeps_displaced_message() {
        let mut q = NotificationQueue::new();
        q.push(Notification::success("Grouped 3 keywords"));
        q.push(Notification::error("Failed to load keywords"));

        assert_eq!(messages(&q), vec!["Failed to load keywords", "Grouped 3 keywords"]);
        assert!(q.pending[0].shown_at.is_none());

        q.dismiss();
        assert_eq!(q.current().unwrap().message, "Grouped 3 keywords");
    }

    #[test]
    fn test_pending_ordered_by_level() {
        let mut q = NotificationQueue::new();
        q.push(Notification::error("e"));
        q.push(Notification::info("i1"));
        q.push(Notification::warning("w"));
        q.push(Notification::info("i2"));
        assert_eq!(messages(&q), vec!["e", "w", "i1", "i2"]);
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn test_repeat_of_current_is_dropped() {
        let mut q = NotificationQueue::new();
        q.push(Notification::warning("Could not check processing status"));
        q.push(Notification::warning("Could not check processing status"));
        assert_eq!(q.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_expires_after_level_duration() {
        let mut q = NotificationQueue::new();
        q.push(Notification::warning("slow"));
        q.push(Notification::info("next"));

        tokio::time::advance(Duration::from_secs(3)).await;
        q.tick();
        assert_eq!(q.current().unwrap().message, "slow");

        tokio::time::advance(Duration::from_secs(1)).await;
        q.tick();
        assert_eq!(q.current().unwrap().message, "next");
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut q = NotificationQueue::new();
        q.push(Notification::info("a"));
        q.push(Notification::error("b"));

        let drained: Vec<String> = q.drain().into_iter().map(|n| n.message).collect();
        assert_eq!(drained, vec!["b", "a"]);
        assert!(q.is_empty());
    }
}
