//! Background task supervisor.
//!
//! Webhook handlers acknowledge immediately and hand the real work to
//! [`BackgroundTasks::spawn`]. Tasks wait for a permit from a bounded
//! semaphore, run inside a span carrying the update id, and stop at the
//! next await point once the supervisor is shut down.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Clone)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
    cancel: CancellationToken,
    permits: Arc<Semaphore>,
}

impl BackgroundTasks {
    pub fn new(max_concurrent: usize, cancel: CancellationToken) -> Self {
        Self {
            tracker: TaskTracker::new(),
            cancel,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run `work` in the background on behalf of `update_id`
    pub fn spawn<F>(&self, update_id: i64, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let permits = Arc::clone(&self.permits);
        let span = info_span!("update", update_id);

        self.tracker.spawn(
            async move {
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Shutdown before a permit was available, dropping update");
                        return;
                    }
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };

                tokio::select! {
                    _ = cancel.cancelled() => warn!("Background work cancelled by shutdown"),
                    _ = work => debug!("Background work finished"),
                }
            }
            .instrument(span),
        );
    }

    /// Number of tasks still running or waiting for a permit
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every spawned task to finish without cancelling them
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel outstanding work and wait (bounded) for tasks to exit
    pub async fn shutdown(&self, grace: Duration) {
        info!(in_flight = self.tracker.len(), "Stopping background tasks");
        self.cancel.cancel();
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            warn!("Background tasks did not stop within the grace period");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_drain_waits_for_tasks() {
        let tasks = BackgroundTasks::new(2, CancellationToken::new());
        let done = Arc::new(AtomicUsize::new(0));
        for id in 0..5 {
            let done = Arc::clone(&done);
            tasks.spawn(id, async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 5);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_running_work() {
        let tasks = BackgroundTasks::new(1, CancellationToken::new());
        let finished = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&finished);
        tasks.spawn(1, async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            flag.fetch_add(1, Ordering::SeqCst);
        });
        tasks.shutdown(Duration::from_secs(1)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(tasks.in_flight(), 0);
    }
}
