use tokio::task::JoinHandle;

/// Tracks the background tasks of one connection
pub struct TaskManager {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Spawn a named task and track it
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|(_, handle)| !handle.is_finished());
        tracing::debug!("Spawning {} task", name);
        self.handles.push((name, tokio::spawn(future)));
    }

    /// Abort all tasks without waiting.
    ///
    /// When called from inside a tracked task, that task is released rather
    /// than aborted so it can finish its own teardown.
    pub fn abort_all(&mut self) {
        let current = tokio::task::try_id();
        for (name, handle) in self.handles.drain(..) {
            if Some(handle.id()) == current {
                continue;
            }
            tracing::debug!("Aborting {} task", name);
            handle.abort();
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_abort_all_clears_tasks() {
        let mut tasks = TaskManager::new();
        tasks.spawn("sleeper", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        assert_eq!(tasks.handles.len(), 1);

        tasks.abort_all();
        assert!(tasks.handles.is_empty());
    }

    #[tokio::test]
    async fn test_finished_tasks_are_pruned_on_spawn() {
        let mut tasks = TaskManager::new();
        tasks.spawn("quick", async {});
        tokio::time::sleep(Duration::from_millis(20)).await;

        tasks.spawn("sleeper", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        assert_eq!(tasks.handles.len(), 1);
        tasks.abort_all();
    }
}
