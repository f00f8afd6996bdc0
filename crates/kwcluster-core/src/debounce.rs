use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Coalesces rapid calls into one, run after a quiet period.
///
/// Every `schedule` supersedes the previous one; only the last call made
/// within the window runs. The returned handle resolves to `true` if that
/// call's future actually ran.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn schedule<F>(&self, task: F) -> JoinHandle<bool>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            task.await;
            true
        })
    }

    /// Drop whatever is pending.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_value_is_sent() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let sent = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for value in [10, 100, 1000] {
            let sent = sent.clone();
            handles.push(debouncer.schedule(async move {
                sent.lock().push(value);
            }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut ran = Vec::new();
        for handle in handles {
            ran.push(handle.await.unwrap());
        }
        assert_eq!(ran, vec![false, false, true]);
        assert_eq!(*sent.lock(), vec![1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_both_fire() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let first = debouncer.schedule(async {});
        tokio::time::sleep(Duration::from_millis(600)).await;
        let second = debouncer.schedule(async {});
        assert!(first.await.unwrap());
        assert!(second.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let handle = debouncer.schedule(async {});
        debouncer.cancel();
        assert!(!handle.await.unwrap());
    }
}
