use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Owns the background tasks driving one socket.
///
/// Tasks are spawned on the ambient tokio runtime. Dropping the manager
/// aborts whatever is still tracked unless it was detached first.
#[derive(Default)]
pub struct TaskManager {
    handles: Vec<JoinHandle<()>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `future` on the current runtime.
    ///
    /// Returns `false` without running it when called outside a runtime.
    pub fn spawn<F>(&mut self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            return false;
        };
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(runtime.spawn(future));
        true
    }

    /// Number of tracked tasks still running
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Abort all tasks without waiting
    pub fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    /// Stop tracking the tasks and let them finish on their own
    pub fn detach_all(&mut self) {
        self.handles.clear();
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_spawn_outside_runtime_is_refused() {
        let mut tasks = TaskManager::new();
        assert!(!tasks.spawn(async {}));
        assert_eq!(tasks.running(), 0);
    }

    #[tokio::test]
    async fn test_drop_aborts_tracked_tasks() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut tasks = TaskManager::new();
        assert!(tasks.spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        }));
        tokio::task::yield_now().await;
        assert_eq!(tasks.running(), 1);

        drop(tasks);
        // Aborted task dropped its sender
        assert!(rx.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_task_keeps_running() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let mut tasks = TaskManager::new();
        tasks.spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(7);
        });

        tasks.detach_all();
        drop(tasks);
        assert_eq!(rx.await.unwrap(), 7);
    }
}
