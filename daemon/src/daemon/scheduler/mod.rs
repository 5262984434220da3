// daemon/src/daemon/scheduler/mod.rs
//! Resource-aware scheduler: a priority queue drained by workers, gated by
//! quota admission and an overload circuit breaker.
//!
//! - `core`: the scheduler handle, lifecycle and status accessors
//! - `submission`: id generation and admission at submit time
//! - `execution`: worker loop and single-task execution
//! - `monitoring`: periodic sampling and breaker control

mod core;
mod execution;
mod monitoring;
mod submission;

pub use self::core::ResourceScheduler;

/// Sink key prefix for per-task records.
pub const TASK_METRICS_PREFIX: &str = "task_metrics:";
/// Sink window holding every finished task record.
pub const TASK_TIMELINE_WINDOW: &str = "task_metrics_timeline";
/// Sink key for the most recent host snapshot.
pub const SYSTEM_METRICS_KEY: &str = "system_metrics:latest";
