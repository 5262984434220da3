// core/src/rpc/message.rs
use crate::utils::models::{ResourceStats, SystemMetrics, TaskMetrics, TaskPriority};
use bincode::{Decode, Encode};

/// Frames exchanged over the daemon socket, one request and one reply per connection.
#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub enum Message {
    // Requests
    DaemonCommand(DaemonAction),
    SubmitCommand(SubmitAction),
    TaskCommand(TaskAction),
    StatsCommand(StatsAction),

    // Replies
    Submitted(String),
    TaskStatus(Vec<TaskMetrics>),
    Stats(ResourceStats),
    Metrics(SystemMetrics),
    Ack(String),
    Error(String),
}

#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub enum DaemonAction {
    Stop,
    Status,
}

#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub enum SubmitAction {
    /// Run a shell command line as a task.
    Command {
        cmd: String,
        task_type: String,
        priority: TaskPriority,
        timeout_secs: Option<u64>,
    },
}

#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub enum TaskAction {
    List { filter: TaskFilter },
    Info { task_id: String },
    Cancel { task_id: String },
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq)]
pub enum TaskFilter {
    All,
    Running,
    Finished,
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq)]
pub enum StatsAction {
    Resources,
    Metrics,
}
