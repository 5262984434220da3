// daemon/src/daemon/admission.rs
use warden_core::{ResourceQuota, SchedulerError, SystemMetrics};

/// Admission decision for one snapshot. Pure: the caller decides which
/// snapshot to pass.
pub fn check_quota(quota: &ResourceQuota, metrics: &SystemMetrics) -> Result<(), SchedulerError> {
    if metrics.cpu_percent > quota.max_cpu_percent {
        return Err(SchedulerError::ResourceExhausted(format!(
            "CPU usage {:.1}% exceeds limit {:.1}%",
            metrics.cpu_percent, quota.max_cpu_percent
        )));
    }
    if metrics.memory_used_mb > quota.max_memory_mb {
        return Err(SchedulerError::ResourceExhausted(format!(
            "memory usage {:.0}MB exceeds limit {:.0}MB",
            metrics.memory_used_mb, quota.max_memory_mb
        )));
    }
    if metrics.active_tasks >= quota.max_concurrent_tasks {
        return Err(SchedulerError::ResourceExhausted(format!(
            "{} active tasks reached limit {}",
            metrics.active_tasks, quota.max_concurrent_tasks
        )));
    }
    if metrics.queued_tasks >= quota.max_queue_size {
        return Err(SchedulerError::ResourceExhausted(format!(
            "{} queued tasks reached limit {}",
            metrics.queued_tasks, quota.max_queue_size
        )));
    }
    Ok(())
}

/// Whether a monitor sample counts toward opening the breaker.
pub fn is_overloaded(quota: &ResourceQuota, metrics: &SystemMetrics, factor: f64) -> bool {
    metrics.cpu_percent > quota.max_cpu_percent * factor
        || metrics.memory_used_mb > quota.max_memory_mb * factor
}
