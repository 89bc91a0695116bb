//! Trailing-edge debouncing for presentation refreshes.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs only the last of a burst of scheduled tasks, `delay` after it was
/// scheduled.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `task`, replacing whatever was pending.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Drop the pending task, if any. Used before an immediate refresh.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counting(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_once() {
        let debouncer = Debouncer::new(Duration::from_millis(250));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            debouncer.schedule(counting(&counter));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_triggers_each_run() {
        let debouncer = Debouncer::new(Duration::from_millis(250));
        let counter = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting(&counter));
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.schedule(counting(&counter));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending() {
        let debouncer = Debouncer::new(Duration::from_millis(250));
        let counter = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting(&counter));
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
