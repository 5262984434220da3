// cli/src/cli/task.rs
use crate::cli::{format_millis, get_socket_path};
use anyhow::{anyhow, Result};
use colored::*;
use structopt::StructOpt;
use warden_core::rpc::message::{Message, TaskAction, TaskFilter};
use warden_core::rpc::request_reply;
use warden_core::{TaskMetrics, TaskStatus};

#[derive(StructOpt, Debug)]
pub enum TaskCommand {
    /// List tasks, newest first (default: all)
    #[structopt(name = "list")]
    List {
        /// Show only running tasks
        #[structopt(long, conflicts_with = "finished")]
        running: bool,

        /// Show only finished tasks
        #[structopt(long, conflicts_with = "running")]
        finished: bool,

        /// Optional path to config file
        #[structopt(long)]
        config: Option<String>,
    },

    /// View task details
    #[structopt(name = "info")]
    Info {
        /// Task ID
        task_id: String,
        /// Optional path to config file
        #[structopt(long)]
        config: Option<String>,
    },

    /// Mark a running task as cancelled
    #[structopt(name = "cancel")]
    Cancel {
        /// Task ID
        task_id: String,
        /// Optional path to config file
        #[structopt(long)]
        config: Option<String>,
    },
}

impl TaskCommand {
    pub fn execute(self) -> Result<()> {
        let config_path = match &self {
            Self::List { config, .. } | Self::Info { config, .. } | Self::Cancel { config, .. } => {
                config.clone()
            }
        };
        let socket_path = get_socket_path(config_path.as_deref())?;

        match self {
            Self::List { running, finished, .. } => {
                let filter = if running {
                    TaskFilter::Running
                } else if finished {
                    TaskFilter::Finished
                } else {
                    TaskFilter::All
                };
                Self::handle_list(&socket_path, filter)
            }
            Self::Info { task_id, .. } => Self::handle_info(&socket_path, task_id),
            Self::Cancel { task_id, .. } => Self::handle_cancel(&socket_path, task_id),
        }
    }

    fn handle_list(socket_path: &str, filter: TaskFilter) -> Result<()> {
        match request_reply(socket_path, &Message::TaskCommand(TaskAction::List { filter }))? {
            Message::TaskStatus(tasks) => {
                println!(
                    "{:<28} {:<10} {:<9} {:<10} {:<20} {:>9}",
                    "ID", "Type", "Priority", "Status", "Started", "Duration"
                );
                println!("{:-<91}", "");
                for task in tasks {
                    println!(
                        "{:<28} {:<10} {:<9} {} {:<20} {:>9}",
                        task.task_id,
                        task.task_type,
                        task.priority.to_string(),
                        colored_status(task.status, 10),
                        format_millis(task.start_time),
                        task.duration
                            .map(|d| format!("{:.2}s", d.as_secs_f64()))
                            .unwrap_or_else(|| "-".into()),
                    );
                }
                Ok(())
            }
            Message::Ack(msg) => {
                println!("{}", msg);
                Ok(())
            }
            Message::Error(err_msg) => Err(anyhow!("Daemon returned error: {}", err_msg)),
            other => Err(anyhow!("Received unexpected reply from daemon: {:?}", other)),
        }
    }

    fn handle_info(socket_path: &str, task_id: String) -> Result<()> {
        let request = Message::TaskCommand(TaskAction::Info { task_id });
        match request_reply(socket_path, &request)? {
            Message::TaskStatus(tasks) => {
                tasks.iter().for_each(print_details);
                Ok(())
            }
            Message::Error(err_msg) => Err(anyhow!("Daemon returned error: {}", err_msg)),
            other => Err(anyhow!("Received unexpected reply from daemon: {:?}", other)),
        }
    }

    fn handle_cancel(socket_path: &str, task_id: String) -> Result<()> {
        let request = Message::TaskCommand(TaskAction::Cancel { task_id });
        match request_reply(socket_path, &request)? {
            Message::Ack(msg) => {
                println!("{} {}", "[SUCCESS]".green(), msg);
                Ok(())
            }
            Message::Error(err_msg) => Err(anyhow!("Daemon returned error: {}", err_msg)),
            other => Err(anyhow!("Received unexpected reply from daemon: {:?}", other)),
        }
    }
}

/// Pads before colouring; escape codes would otherwise count toward the width.
fn colored_status(status: TaskStatus, width: usize) -> ColoredString {
    let text = format!("{:<width$}", status.to_string(), width = width);
    match status {
        TaskStatus::Running => text.blue(),
        TaskStatus::Completed => text.green(),
        TaskStatus::Failed | TaskStatus::Timeout => text.red(),
        TaskStatus::Cancelled => text.yellow(),
    }
}

fn label(text: &str) -> ColoredString {
    format!("{:<12}", text).bold()
}

fn print_details(task: &TaskMetrics) {
    println!("{} {}", label("ID:"), task.task_id);
    println!("{} {}", label("Type:"), task.task_type);
    println!("{} {}", label("Priority:"), task.priority);
    println!("{} {}", label("Status:"), colored_status(task.status, 0));
    println!("{} {}", label("Started:"), format_millis(task.start_time));
    if let Some(end_time) = task.end_time {
        println!("{} {}", label("Ended:"), format_millis(end_time));
    }
    if let Some(duration) = task.duration {
        println!("{} {:.2}s", label("Duration:"), duration.as_secs_f64());
    }
    if task.end_time.is_some() {
        println!(
            "{} {:.1}% CPU, {:.1}% memory (host)",
            label("Usage:"),
            task.cpu_usage,
            task.memory_usage
        );
    }
    if let Some(error) = &task.error {
        println!("{} {}", label("Error:"), error.red());
    }
}
