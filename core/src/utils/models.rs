// core/src/utils/models.rs
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Urgency class of a task. Smaller is more urgent, so the derived `Ord`
/// sorts `Critical` first.
#[derive(
    Encode,
    Decode,
    Clone,
    Copy,
    Debug,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskPriority::Critical => "critical",
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        };
        f.write_str(name)
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(TaskPriority::Critical),
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            other => Err(format!(
                "unknown priority '{}' (expected critical|high|medium|low)",
                other
            )),
        }
    }
}

#[derive(Encode, Decode, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    Timeout,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Timeout => "timeout",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Fixed ceilings for one scheduler instance.
#[derive(Encode, Decode, Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResourceQuota {
    pub max_cpu_percent: f64,
    pub max_memory_mb: f64,
    pub max_concurrent_tasks: usize,
    pub max_queue_size: usize,
}

impl Default for ResourceQuota {
    fn default() -> Self {
        ResourceQuota {
            max_cpu_percent: 80.0,
            max_memory_mb: 2048.0,
            max_concurrent_tasks: 10,
            max_queue_size: 1000,
        }
    }
}

/// Point-in-time host reading plus the scheduler's own counts.
#[derive(Encode, Decode, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: f64,
    pub active_tasks: usize,
    pub queued_tasks: usize,
    pub timestamp: u64, // ms since epoch
}

impl SystemMetrics {
    /// Reading used when the host could not be sampled.
    pub fn zeroed(active_tasks: usize, queued_tasks: usize) -> Self {
        SystemMetrics { active_tasks, queued_tasks, timestamp: now_millis(), ..Default::default() }
    }
}

/// Execution record of a single task, created when the worker starts it.
#[derive(Encode, Decode, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TaskMetrics {
    pub task_id: String,
    pub task_type: String,
    pub priority: TaskPriority,
    pub cpu_usage: f64,    // host CPU % at completion
    pub memory_usage: f64, // host memory % at completion
    pub duration: Option<Duration>,
    pub start_time: u64,       // ms since epoch
    pub end_time: Option<u64>, // ms since epoch
    pub status: TaskStatus,
    pub error: Option<String>,
}

impl TaskMetrics {
    pub fn started(task_id: &str, task_type: &str, priority: TaskPriority) -> Self {
        TaskMetrics {
            task_id: task_id.to_string(),
            task_type: task_type.to_string(),
            priority,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            duration: None,
            start_time: now_millis(),
            end_time: None,
            status: TaskStatus::Running,
            error: None,
        }
    }
}

/// Per-task-type aggregate over a window of finished records.
#[derive(Encode, Decode, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskTypeStats {
    pub count: usize,
    pub avg_duration_secs: f64,
    pub avg_cpu_usage: f64,
    pub completion_rate: f64,
}

impl TaskTypeStats {
    pub fn aggregate<'a, I>(records: I) -> BTreeMap<String, TaskTypeStats>
    where
        I: IntoIterator<Item = &'a TaskMetrics>,
    {
        // (count, duration sum, cpu sum, completed)
        let mut sums: BTreeMap<String, (usize, f64, f64, usize)> = BTreeMap::new();
        for record in records {
            let entry = sums.entry(record.task_type.clone()).or_default();
            entry.0 += 1;
            entry.1 += record.duration.map(|d| d.as_secs_f64()).unwrap_or_default();
            entry.2 += record.cpu_usage;
            if record.status == TaskStatus::Completed {
                entry.3 += 1;
            }
        }

        sums.into_iter()
            .map(|(task_type, (count, duration, cpu, completed))| {
                let n = count as f64;
                let stats = TaskTypeStats {
                    count,
                    avg_duration_secs: duration / n,
                    avg_cpu_usage: cpu / n,
                    completion_rate: completed as f64 / n,
                };
                (task_type, stats)
            })
            .collect()
    }
}

#[derive(Encode, Decode, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResourceStats {
    pub current_metrics: SystemMetrics,
    pub quota: ResourceQuota,
    pub queue_size: usize,
    pub active_tasks: usize,
    pub circuit_breaker_open: bool,
    pub consecutive_overloads: u32,
    pub task_type_stats: BTreeMap<String, TaskTypeStats>,
}
