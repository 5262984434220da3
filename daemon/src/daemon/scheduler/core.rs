// daemon/src/daemon/scheduler/core.rs
use crate::daemon::queue::PriorityQueue;
use crate::daemon::state::SchedulerState;
use crate::daemon::task::QueuedTask;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinHandle;
use warden_core::rpc::message::TaskFilter;
use warden_core::utils::models::now_millis;
use warden_core::{
    MetricsProvider, MetricsSink, ResourceStats, SchedulerConfig, SchedulerError, SystemMetrics,
    TaskMetrics, TaskTypeStats,
};

/// Handle to one scheduler instance. Clones share everything.
#[derive(Clone)]
pub struct ResourceScheduler {
    pub(super) inner: Arc<SchedulerInner>,
}

pub(super) struct SchedulerInner {
    pub(super) config: SchedulerConfig,
    pub(super) state: SchedulerState,
    pub(super) queue: PriorityQueue<QueuedTask>,
    pub(super) provider: Arc<dyn MetricsProvider>,
    pub(super) sink: Option<Arc<dyn MetricsSink>>,
    /// Caps concurrently executing tasks across all workers.
    pub(super) permits: Arc<Semaphore>,
    runtime: Mutex<Option<Runtime>>,
}

struct Runtime {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl ResourceScheduler {
    pub fn new(config: SchedulerConfig, provider: Arc<dyn MetricsProvider>) -> Self {
        Self::build(config, provider, None)
    }

    /// Like [`ResourceScheduler::new`], forwarding finished records and host
    /// snapshots to `sink`.
    pub fn with_sink(
        config: SchedulerConfig,
        provider: Arc<dyn MetricsProvider>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self::build(config, provider, Some(sink))
    }

    fn build(
        config: SchedulerConfig,
        provider: Arc<dyn MetricsProvider>,
        sink: Option<Arc<dyn MetricsSink>>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.quota.max_concurrent_tasks.max(1)));
        let inner = SchedulerInner {
            state: SchedulerState::new(config.history_limit),
            queue: PriorityQueue::new(),
            provider,
            sink,
            permits,
            runtime: Mutex::new(None),
            config,
        };
        Self { inner: Arc::new(inner) }
    }

    /// Spawns the monitor loop and the configured number of workers.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut runtime = self.inner.runtime.lock().await;
        if runtime.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker_count = self.inner.config.resolved_worker_count();
        let mut handles = Vec::with_capacity(worker_count + 1);
        handles.push(tokio::spawn(self.clone().run_monitor(shutdown_rx.clone())));
        for worker_id in 0..worker_count {
            handles.push(tokio::spawn(self.clone().run_worker(worker_id, shutdown_rx.clone())));
        }

        *runtime = Some(Runtime { shutdown_tx, handles });
        info!(
            "Scheduler started with {} worker(s), quota {:?}.",
            worker_count, self.inner.config.quota
        );
        Ok(())
    }

    /// Signals both loops and waits for them. A task already executing is
    /// allowed to reach its terminal status first; queued work stays queued.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let runtime = self.inner.runtime.lock().await.take().ok_or(SchedulerError::NotRunning)?;
        info!("Stopping scheduler...");
        let _ = runtime.shutdown_tx.send(true);
        for handle in runtime.handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!("Scheduler loop ended abnormally: {}", e);
                }
            }
        }
        info!("Scheduler stopped.");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.inner.runtime.lock().await.is_some()
    }

    // --- Status API ---

    pub async fn get_task_status(&self, task_id: &str) -> Option<TaskMetrics> {
        self.inner.state.get_task(task_id).await
    }

    /// Best effort: marks the task and raises its flag, never interrupts it.
    pub async fn cancel_task(&self, task_id: &str) -> bool {
        let cancelled = self.inner.state.cancel_task(task_id).await;
        if cancelled {
            info!("Task {} marked as cancelled.", task_id);
        }
        cancelled
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> Vec<TaskMetrics> {
        self.inner.state.list_tasks(filter).await
    }

    pub async fn get_system_metrics(&self) -> SystemMetrics {
        self.latest_metrics().await
    }

    pub async fn get_resource_stats(&self) -> ResourceStats {
        let current_metrics = self.latest_metrics().await;
        let recent = self.inner.state.recent_history(self.inner.config.stats_window).await;
        ResourceStats {
            current_metrics,
            quota: self.inner.config.quota.clone(),
            queue_size: self.inner.queue.len().await,
            active_tasks: self.inner.state.active_count().await,
            circuit_breaker_open: self.inner.state.is_breaker_open().await,
            consecutive_overloads: self.inner.state.consecutive_overloads().await,
            task_type_stats: TaskTypeStats::aggregate(&recent),
        }
    }

    pub async fn queue_len(&self) -> usize {
        self.inner.queue.len().await
    }

    // --- Metrics helpers ---

    /// Last published snapshot; samples and publishes one if the monitor has
    /// not run yet.
    pub(super) async fn latest_metrics(&self) -> SystemMetrics {
        if let Some(metrics) = self.inner.state.current_metrics().await {
            return metrics;
        }
        let metrics = self.sample_metrics().await;
        self.inner.state.publish_metrics(metrics.clone()).await;
        metrics
    }

    /// Fresh host reading with live counts. A failed sample yields zeroed
    /// host figures.
    pub(super) async fn sample_metrics(&self) -> SystemMetrics {
        let active_tasks = self.inner.state.active_count().await;
        let queued_tasks = self.inner.queue.len().await;
        let provider = &self.inner.provider;

        let sampled = provider.sample_cpu_percent().and_then(|cpu| {
            provider
                .sample_memory()
                .map(|(used_mb, percent)| (cpu, used_mb, percent))
        });
        match sampled {
            Ok((cpu_percent, memory_used_mb, memory_percent)) => SystemMetrics {
                cpu_percent,
                memory_percent,
                memory_used_mb,
                active_tasks,
                queued_tasks,
                timestamp: now_millis(),
            },
            Err(e) => {
                error!("Failed to sample host metrics: {:#}", e);
                SystemMetrics::zeroed(active_tasks, queued_tasks)
            }
        }
    }
}
