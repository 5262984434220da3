// core/src/config.rs
use crate::utils::models::ResourceQuota;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    None,
    Memory,
}

/// Scheduler tuning, read from the `scheduler` object of the daemon config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SchedulerConfig {
    #[serde(default)]
    pub quota: ResourceQuota,
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default = "default_requeue_delay_ms")]
    pub requeue_delay_ms: u64,
    /// Multiple of the quota above which a sample counts as overloaded.
    #[serde(default = "default_overload_factor")]
    pub overload_factor: f64,
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,
    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Number of most recent history entries aggregated by `get_resource_stats`.
    #[serde(default = "default_stats_window")]
    pub stats_window: usize,
    #[serde(default = "default_task_timeout_secs")]
    pub default_task_timeout_secs: u64,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_sink_ttl_secs")]
    pub sink_ttl_secs: u64,
    #[serde(default)]
    pub metrics_sink: SinkKind,
}

fn default_monitor_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_ms() -> u64 {
    1000
}

fn default_requeue_delay_ms() -> u64 {
    100
}

fn default_overload_factor() -> f64 {
    1.2
}

fn default_breaker_threshold() -> u32 {
    5
}

fn default_breaker_cooldown_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    1000
}

fn default_stats_window() -> usize {
    100
}

fn default_task_timeout_secs() -> u64 {
    300
}

fn default_worker_count() -> usize {
    1
}

fn default_sink_ttl_secs() -> u64 {
    3600
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quota: ResourceQuota::default(),
            monitor_interval_ms: default_monitor_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            requeue_delay_ms: default_requeue_delay_ms(),
            overload_factor: default_overload_factor(),
            breaker_threshold: default_breaker_threshold(),
            breaker_cooldown_secs: default_breaker_cooldown_secs(),
            history_limit: default_history_limit(),
            stats_window: default_stats_window(),
            default_task_timeout_secs: default_task_timeout_secs(),
            worker_count: default_worker_count(),
            sink_ttl_secs: default_sink_ttl_secs(),
            metrics_sink: SinkKind::None,
        }
    }
}

impl SchedulerConfig {
    pub fn with_quota(quota: ResourceQuota) -> Self {
        Self { quota, ..Self::default() }
    }

    /// Never zero; `tokio::time::interval` rejects a zero period.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms.max(1))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn requeue_delay(&self) -> Duration {
        Duration::from_millis(self.requeue_delay_ms)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }

    pub fn default_task_timeout(&self) -> Duration {
        Duration::from_secs(self.default_task_timeout_secs)
    }

    pub fn sink_ttl(&self) -> Duration {
        Duration::from_secs(self.sink_ttl_secs)
    }

    /// At least one worker always runs.
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.monitor_interval(), Duration::from_secs(1));
        assert_eq!(config.requeue_delay(), Duration::from_millis(100));
        assert_eq!(config.breaker_threshold, 5);
        assert_eq!(config.breaker_cooldown(), Duration::from_secs(30));
        assert_eq!(config.history_limit, 1000);
        assert_eq!(config.stats_window, 100);
        assert_eq!(config.resolved_worker_count(), 1);
        assert_eq!(config.metrics_sink, SinkKind::None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SchedulerConfig = serde_json::from_str(
            r#"{"quota": {"max-concurrent-tasks": 1}, "worker-count": 0, "metrics-sink": "memory"}"#,
        )
        .unwrap();
        assert_eq!(config.quota.max_concurrent_tasks, 1);
        assert_eq!(config.quota.max_cpu_percent, 80.0);
        assert_eq!(config.resolved_worker_count(), 1);
        assert_eq!(config.metrics_sink, SinkKind::Memory);
        assert_eq!(config.default_task_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn zero_monitor_interval_is_clamped() {
        let config = SchedulerConfig { monitor_interval_ms: 0, ..Default::default() };
        assert_eq!(config.monitor_interval(), Duration::from_millis(1));
    }
}
