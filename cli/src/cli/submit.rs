// cli/src/cli/submit.rs
use crate::cli::get_socket_path;
use anyhow::{anyhow, Result};
use colored::*;
use structopt::StructOpt;
use warden_core::rpc::message::{Message, SubmitAction};
use warden_core::rpc::request_reply;
use warden_core::TaskPriority;

#[derive(StructOpt, Debug)]
pub enum SubmitCommand {
    /// Submit a command line as a task
    #[structopt(name = "command")]
    Command {
        /// Command to execute
        #[structopt(long)]
        cmd: String,

        /// Task type used for statistics and the task id prefix
        #[structopt(long, default_value = "command")]
        task_type: String,

        /// critical | high | medium | low
        #[structopt(long, default_value = "medium")]
        priority: TaskPriority,

        /// Deadline in seconds; the daemon default applies when omitted
        #[structopt(long)]
        timeout: Option<u64>,

        /// Optional path to config file
        #[structopt(long)]
        config: Option<String>,
    },
}

impl SubmitCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Command { cmd, task_type, priority, timeout, config } => {
                let socket_path = get_socket_path(config.as_deref())?;
                Self::handle_command(&socket_path, cmd, task_type, priority, timeout)
            }
        }
    }

    fn handle_command(
        socket_path: &str,
        cmd: String,
        task_type: String,
        priority: TaskPriority,
        timeout_secs: Option<u64>,
    ) -> Result<()> {
        println!("Submitting '{}' as {} ({}) via RPC...", cmd, task_type.cyan(), priority);
        let request = Message::SubmitCommand(SubmitAction::Command {
            cmd,
            task_type,
            priority,
            timeout_secs,
        });

        match request_reply(socket_path, &request) {
            Ok(Message::Submitted(task_id)) => {
                println!("{} Task queued: {}", "[SUCCESS]".green(), task_id.bold());
                Ok(())
            }
            Ok(Message::Error(err_msg)) => Err(anyhow!("Daemon returned error: {}", err_msg)),
            Ok(other) => Err(anyhow!("Received unexpected reply from daemon: {:?}", other)),
            Err(e) => Err(anyhow!("Failed to send command task to daemon").context(e)),
        }
    }
}
