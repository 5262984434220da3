// daemon/src/daemon/scheduler/submission.rs
use super::ResourceScheduler;
use crate::daemon::admission::check_quota;
use crate::daemon::task::{boxed_task, next_task_id, QueuedTask, TaskArgs, TaskContext};
use log::{debug, info};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use warden_core::{SchedulerError, TaskPriority};

impl ResourceScheduler {
    /// Queues `task` and returns its id without waiting for it to run.
    ///
    /// Fails fast with `CircuitBreakerOpen` or `ResourceExhausted`. A `None`
    /// timeout uses the configured default.
    pub async fn submit<F, Fut, T, E>(
        &self,
        task: F,
        task_type: &str,
        priority: TaskPriority,
        timeout: Option<Duration>,
        args: TaskArgs,
    ) -> Result<String, SchedulerError>
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let task_id = next_task_id(task_type);
        if let Err(e) = self.admit().await {
            debug!("Rejected task {}: {}", task_id, e);
            return Err(e);
        }

        let queued = QueuedTask {
            task_id: task_id.clone(),
            task_type: task_type.to_string(),
            timeout: timeout.unwrap_or_else(|| self.inner.config.default_task_timeout()),
            args,
            run: boxed_task(task),
        };
        self.inner.queue.push(priority, queued).await;
        info!("Task {} queued with priority {}.", task_id, priority);
        Ok(task_id)
    }

    /// Breaker first, then the quota against the last published host reading
    /// combined with the live active and queued counts.
    pub(super) async fn admit(&self) -> Result<(), SchedulerError> {
        if self.inner.state.is_breaker_open().await {
            return Err(SchedulerError::CircuitBreakerOpen);
        }
        let mut snapshot = self.latest_metrics().await;
        snapshot.active_tasks = self.inner.state.active_count().await;
        snapshot.queued_tasks = self.inner.queue.len().await;
        check_quota(&self.inner.config.quota, &snapshot)
    }
}
