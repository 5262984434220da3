// daemon/src/daemon/handlers/submit_handler.rs
use crate::daemon::scheduler::ResourceScheduler;
use crate::daemon::shell::{parse_command, run_command};
use crate::daemon::task::{TaskArgs, TaskContext};
use anyhow::Result;
use std::time::Duration;
use warden_core::rpc::message::{Message, SubmitAction};

pub async fn handle_submit_command(
    action: SubmitAction,
    scheduler: ResourceScheduler,
) -> Result<Message> {
    match action {
        SubmitAction::Command { cmd, task_type, priority, timeout_secs } => {
            log::info!(
                "Handling SubmitCommand::Command: cmd={}, type={}, priority={}, timeout={:?}",
                cmd,
                task_type,
                priority,
                timeout_secs
            );
            let argv = match parse_command(&cmd) {
                Ok(argv) => argv,
                Err(e) => return Ok(Message::Error(format!("Invalid command: {}", e))),
            };
            let args = TaskArgs::from(argv.clone());
            let task = move |ctx: TaskContext| async move {
                run_command(argv, ctx).await.map_err(|e| format!("{:#}", e))
            };

            let timeout = timeout_secs.map(Duration::from_secs);
            match scheduler.submit(task, &task_type, priority, timeout, args).await {
                Ok(task_id) => Ok(Message::Submitted(task_id)),
                Err(e) => {
                    log::warn!("Submission of '{}' rejected: {}", cmd, e);
                    Ok(Message::Error(format!("Submission rejected: {}", e)))
                }
            }
        }
    }
}
