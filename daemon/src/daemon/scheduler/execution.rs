// daemon/src/daemon/scheduler/execution.rs
use super::{ResourceScheduler, TASK_METRICS_PREFIX, TASK_TIMELINE_WINDOW};
use crate::daemon::task::{QueuedTask, TaskContext};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Instant};
use warden_core::utils::models::now_millis;
use warden_core::{TaskMetrics, TaskPriority, TaskStatus};

impl ResourceScheduler {
    pub(super) async fn run_worker(self, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        info!("Worker {} started.", worker_id);
        let poll_timeout = self.inner.config.poll_timeout();

        loop {
            if *shutdown.borrow() {
                break;
            }
            let next = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                next = self.inner.queue.pop_timeout(poll_timeout) => next,
            };
            let Some((priority, task)) = next else {
                continue;
            };

            if let Err(e) = self.admit().await {
                debug!("Worker {} deferring task {}: {}", worker_id, task.task_id, e);
                self.inner.queue.push(priority, task).await;
                sleep(self.inner.config.requeue_delay()).await;
                continue;
            }

            let permit = match Arc::clone(&self.inner.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(
                        "Worker {} lost its execution permits; requeueing {}.",
                        worker_id, task.task_id
                    );
                    self.inner.queue.push(priority, task).await;
                    break;
                }
            };
            self.execute(priority, task).await;
            drop(permit);
        }

        info!("Worker {} stopped.", worker_id);
    }

    /// Runs one task under its deadline and records the outcome.
    pub(super) async fn execute(&self, priority: TaskPriority, task: QueuedTask) {
        let QueuedTask { task_id, task_type, timeout: deadline, args, run } = task;

        let record = TaskMetrics::started(&task_id, &task_type, priority);
        let cancelled = self.inner.state.begin_task(record).await;
        let ctx = TaskContext::new(task_id.clone(), args, cancelled);
        info!("Task {} ({}, {}) started.", task_id, task_type, priority);

        let started = Instant::now();
        let mut handle = tokio::spawn(run(ctx));
        let (status, error) = match timeout(deadline, &mut handle).await {
            Ok(Ok(Ok(()))) => (TaskStatus::Completed, None),
            Ok(Ok(Err(e))) => (TaskStatus::Failed, Some(e)),
            Ok(Err(join_error)) => (TaskStatus::Failed, Some(join_error.to_string())),
            Err(_) => {
                handle.abort();
                (TaskStatus::Timeout, None)
            }
        };
        let elapsed = started.elapsed();

        let host = self.sample_metrics().await;
        let Some(record) = self
            .inner
            .state
            .finish_task(&task_id, status, error, elapsed, &host)
            .await
        else {
            return;
        };

        match record.status {
            TaskStatus::Completed => info!("Task {} completed in {:.2?}.", task_id, elapsed),
            TaskStatus::Timeout => warn!("Task {} timed out after {:?}.", task_id, deadline),
            TaskStatus::Cancelled => info!("Task {} finished as cancelled.", task_id),
            _ => error!(
                "Task {} failed: {}",
                task_id,
                record.error.as_deref().unwrap_or("unknown error")
            ),
        }
        self.forward_record(&record).await;
    }

    async fn forward_record(&self, record: &TaskMetrics) {
        let Some(sink) = &self.inner.sink else {
            return;
        };
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize record for task {}: {}", record.task_id, e);
                return;
            }
        };

        let key = format!("{}{}", TASK_METRICS_PREFIX, record.task_id);
        if let Err(e) = sink.put(&key, &payload, self.inner.config.sink_ttl()).await {
            warn!("Metrics sink rejected {}: {:#}", key, e);
        }
        let timestamp = record.end_time.unwrap_or_else(now_millis);
        if let Err(e) = sink.append(TASK_TIMELINE_WINDOW, timestamp, &payload).await {
            warn!("Metrics sink rejected timeline entry for {}: {:#}", record.task_id, e);
        }
    }
}
