// daemon/src/daemon/state.rs
use crate::daemon::breaker::{BreakerTransition, CircuitBreaker};
use log::warn;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use warden_core::rpc::message::TaskFilter;
use warden_core::utils::models::now_millis;
use warden_core::{SystemMetrics, TaskMetrics, TaskStatus};

/// Shared scheduler state. Cloning hands out another handle to the same data.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    inner: Arc<RwLock<InnerState>>,
    history_limit: usize,
}

#[derive(Debug)]
struct ActiveTask {
    record: TaskMetrics,
    cancelled: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct InnerState {
    active: HashMap<String, ActiveTask>,
    history: VecDeque<TaskMetrics>, // oldest at the front
    current_metrics: Option<SystemMetrics>,
    breaker: CircuitBreaker,
}

impl SchedulerState {
    pub fn new(history_limit: usize) -> Self {
        SchedulerState { inner: Arc::new(RwLock::new(InnerState::default())), history_limit }
    }

    // --- Task records ---

    /// Registers a started task and returns its cancellation flag.
    pub async fn begin_task(&self, record: TaskMetrics) -> Arc<AtomicBool> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.inner.write().await;
        let task_id = record.task_id.clone();
        let entry = ActiveTask { record, cancelled: Arc::clone(&cancelled) };
        if state.active.insert(task_id.clone(), entry).is_some() {
            warn!("Task {} was already active and has been replaced.", task_id);
        }
        cancelled
    }

    /// Flips a running task to `cancelled` and raises its flag.
    /// Returns false for unknown or already finished tasks.
    pub async fn cancel_task(&self, task_id: &str) -> bool {
        let mut state = self.inner.write().await;
        match state.active.get_mut(task_id) {
            Some(task) if task.record.status == TaskStatus::Running => {
                task.record.status = TaskStatus::Cancelled;
                task.cancelled.store(true, Ordering::Release);
                true
            }
            _ => false,
        }
    }

    /// Moves a task from the active table into history with its terminal
    /// status. A task cancelled while running stays `cancelled`.
    pub async fn finish_task(
        &self,
        task_id: &str,
        status: TaskStatus,
        error: Option<String>,
        duration: Duration,
        host: &SystemMetrics,
    ) -> Option<TaskMetrics> {
        let mut state = self.inner.write().await;
        let Some(ActiveTask { mut record, .. }) = state.active.remove(task_id) else {
            warn!("Finished task {} was not in the active table.", task_id);
            return None;
        };

        if record.status != TaskStatus::Cancelled {
            record.status = status;
            record.error = error;
        }
        record.duration = Some(duration);
        record.end_time = Some(now_millis());
        record.cpu_usage = host.cpu_percent;
        record.memory_usage = host.memory_percent;

        state.history.push_back(record.clone());
        while state.history.len() > self.history_limit {
            state.history.pop_front();
        }
        Some(record)
    }

    /// Active entry first, then the newest history entry with that id.
    pub async fn get_task(&self, task_id: &str) -> Option<TaskMetrics> {
        let state = self.inner.read().await;
        if let Some(task) = state.active.get(task_id) {
            return Some(task.record.clone());
        }
        state.history.iter().rev().find(|record| record.task_id == task_id).cloned()
    }

    /// Newest first.
    pub async fn list_tasks(&self, filter: TaskFilter) -> Vec<TaskMetrics> {
        let state = self.inner.read().await;
        let mut active: Vec<TaskMetrics> = match filter {
            TaskFilter::All | TaskFilter::Running => {
                state.active.values().map(|task| task.record.clone()).collect()
            }
            TaskFilter::Finished => Vec::new(),
        };
        active.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| b.task_id.cmp(&a.task_id))
        });

        if filter != TaskFilter::Running {
            active.extend(state.history.iter().rev().cloned());
        }
        active
    }

    pub async fn active_count(&self) -> usize {
        self.inner.read().await.active.len()
    }

    /// Up to `n` most recent history entries, oldest first.
    pub async fn recent_history(&self, n: usize) -> Vec<TaskMetrics> {
        let state = self.inner.read().await;
        let skip = state.history.len().saturating_sub(n);
        state.history.iter().skip(skip).cloned().collect()
    }

    // --- Host metrics ---

    pub async fn current_metrics(&self) -> Option<SystemMetrics> {
        self.inner.read().await.current_metrics.clone()
    }

    pub async fn publish_metrics(&self, metrics: SystemMetrics) {
        self.inner.write().await.current_metrics = Some(metrics);
    }

    // --- Circuit breaker ---

    pub async fn is_breaker_open(&self) -> bool {
        self.inner.read().await.breaker.is_open()
    }

    pub async fn consecutive_overloads(&self) -> u32 {
        self.inner.read().await.breaker.consecutive_overloads()
    }

    pub async fn record_sample(&self, overloaded: bool, threshold: u32) -> BreakerTransition {
        self.inner.write().await.breaker.record_sample(overloaded, threshold)
    }

    pub async fn close_breaker(&self, generation: u64) -> bool {
        self.inner.write().await.breaker.close(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::TaskPriority;

    fn host(cpu: f64, mem_percent: f64) -> SystemMetrics {
        SystemMetrics { cpu_percent: cpu, memory_percent: mem_percent, ..Default::default() }
    }

    async fn run_to_end(state: &SchedulerState, id: &str, status: TaskStatus) {
        state.begin_task(TaskMetrics::started(id, "job", TaskPriority::Medium)).await;
        state.finish_task(id, status, None, Duration::from_millis(5), &host(1.0, 2.0)).await;
    }

    #[tokio::test]
    async fn finish_moves_record_into_history() {
        let state = SchedulerState::new(10);
        state.begin_task(TaskMetrics::started("job_1", "job", TaskPriority::High)).await;
        assert_eq!(state.active_count().await, 1);

        let record = state
            .finish_task(
                "job_1",
                TaskStatus::Failed,
                Some("boom".into()),
                Duration::from_secs(2),
                &host(40.0, 55.0),
            )
            .await
            .unwrap();

        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert_eq!(record.cpu_usage, 40.0);
        assert_eq!(record.memory_usage, 55.0);
        assert!(record.end_time.is_some());
        assert_eq!(state.active_count().await, 0);
        assert_eq!(state.get_task("job_1").await, Some(record));
    }

    #[tokio::test]
    async fn cancelled_status_survives_completion() {
        let state = SchedulerState::new(10);
        let flag = state.begin_task(TaskMetrics::started("job_2", "job", TaskPriority::Low)).await;

        assert!(state.cancel_task("job_2").await);
        assert!(flag.load(Ordering::Acquire));
        assert!(!state.cancel_task("job_2").await);

        let record = state
            .finish_task("job_2", TaskStatus::Completed, None, Duration::ZERO, &host(0.0, 0.0))
            .await
            .unwrap();
        assert_eq!(record.status, TaskStatus::Cancelled);
        assert!(!state.cancel_task("job_2").await);
        assert!(!state.cancel_task("missing").await);
    }

    #[tokio::test]
    async fn history_evicts_oldest_first() {
        let state = SchedulerState::new(3);
        for i in 0..5 {
            run_to_end(&state, &format!("job_{}", i), TaskStatus::Completed).await;
        }

        let ids: Vec<String> =
            state.recent_history(10).await.into_iter().map(|r| r.task_id).collect();
        assert_eq!(ids, vec!["job_2", "job_3", "job_4"]);
        assert!(state.get_task("job_0").await.is_none());

        let last_two: Vec<String> =
            state.recent_history(2).await.into_iter().map(|r| r.task_id).collect();
        assert_eq!(last_two, vec!["job_3", "job_4"]);
    }

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let state = SchedulerState::new(10);
        run_to_end(&state, "job_a", TaskStatus::Completed).await;
        run_to_end(&state, "job_b", TaskStatus::Timeout).await;
        state.begin_task(TaskMetrics::started("job_c", "job", TaskPriority::Medium)).await;

        let ids = |records: Vec<TaskMetrics>| {
            records.into_iter().map(|r| r.task_id).collect::<Vec<_>>()
        };
        assert_eq!(ids(state.list_tasks(TaskFilter::Running).await), vec!["job_c"]);
        assert_eq!(ids(state.list_tasks(TaskFilter::Finished).await), vec!["job_b", "job_a"]);
        assert_eq!(ids(state.list_tasks(TaskFilter::All).await), vec!["job_c", "job_b", "job_a"]);
    }

    #[tokio::test]
    async fn breaker_round_trip_through_state() {
        let state = SchedulerState::new(10);
        for _ in 0..4 {
            state.record_sample(true, 5).await;
        }
        assert_eq!(state.consecutive_overloads().await, 4);
        let transition = state.record_sample(true, 5).await;
        assert_eq!(transition, BreakerTransition::Opened { generation: 1 });
        assert!(state.is_breaker_open().await);
        assert!(state.close_breaker(1).await);
        assert!(!state.is_breaker_open().await);
    }
}
