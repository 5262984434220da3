// daemon/src/daemon/task.rs
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use warden_core::utils::models::now_millis;

/// Free-form arguments handed to the task body untouched.
pub type TaskArgs = serde_json::Value;

/// What a running task body receives.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: String,
    pub args: TaskArgs,
    cancelled: Arc<AtomicBool>,
}

impl TaskContext {
    pub(crate) fn new(task_id: String, args: TaskArgs, cancelled: Arc<AtomicBool>) -> Self {
        Self { task_id, args, cancelled }
    }

    /// Set once `cancel_task` has been called for this task. Bodies that
    /// care should poll it and return early; nothing interrupts them.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

pub(crate) type TaskFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
pub(crate) type TaskFn = Box<dyn FnOnce(TaskContext) -> TaskFuture + Send>;

/// A queue entry. It has no `TaskMetrics` until a worker starts it.
pub(crate) struct QueuedTask {
    pub task_id: String,
    pub task_type: String,
    pub timeout: Duration,
    pub args: TaskArgs,
    pub run: TaskFn,
}

/// Erases the caller's closure into a body whose error is its display text.
pub(crate) fn boxed_task<F, Fut, T, E>(task: F) -> TaskFn
where
    F: FnOnce(TaskContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    Box::new(move |ctx| {
        Box::pin(async move { task(ctx).await.map(|_| ()).map_err(|e| e.to_string()) })
    })
}

static LAST_ID_MILLIS: AtomicU64 = AtomicU64::new(0);

/// `<task_type>_<millis>`. The millisecond part is strictly increasing
/// across the process, so two submissions in the same millisecond still
/// get distinct ids.
pub(crate) fn next_task_id(task_type: &str) -> String {
    let now = now_millis();
    let previous = LAST_ID_MILLIS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        .unwrap_or_else(|last| last);
    format!("{}_{}", task_type, now.max(previous + 1))
}
