// core/src/lib.rs
pub mod config;
pub mod error;
pub mod host;
pub mod rpc;
pub mod sink;
pub mod utils;

pub use config::{SchedulerConfig, SinkKind};
pub use error::SchedulerError;
pub use host::{HostMonitor, MetricsProvider};
pub use sink::{MemorySink, MetricsSink};
pub use utils::models::{
    ResourceQuota, ResourceStats, SystemMetrics, TaskMetrics, TaskPriority, TaskStatus,
    TaskTypeStats,
};
