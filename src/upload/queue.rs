use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

/// Bounded pool for upload tasks.
///
/// Tasks are spawned onto the given runtime right away and wait for a permit
/// before running, so at most `max_in_flight` of them do work at once.
/// Spawning never blocks the caller.
#[derive(Clone)]
pub struct UploadQueue {
    handle: Handle,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl UploadQueue {
    pub fn new(handle: Handle, max_in_flight: usize) -> Self {
        Self {
            handle,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.tracker.spawn_on(
            async move {
                // The semaphore is never closed.
                let _permit = permits.acquire_owned().await.ok();
                task.await;
            },
            &self.handle,
        );
    }

    /// Tasks spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every task spawned so far. Tasks spawned while draining are
    /// waited for too.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl std::fmt::Debug for UploadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadQueue")
            .field("in_flight", &self.tracker.len())
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}
