// daemon/src/daemon/handlers/task_handler.rs
use crate::daemon::scheduler::ResourceScheduler;
use anyhow::Result;
use warden_core::rpc::message::{Message, TaskAction, TaskFilter};

/// Handles task commands
pub async fn handle_task_command(
    action: TaskAction,
    scheduler: ResourceScheduler,
) -> Result<Message> {
    match action {
        TaskAction::List { filter } => handle_task_list(filter, scheduler).await,
        TaskAction::Info { task_id } => handle_task_info(task_id, scheduler).await,
        TaskAction::Cancel { task_id } => handle_task_cancel(task_id, scheduler).await,
    }
}

async fn handle_task_list(filter: TaskFilter, scheduler: ResourceScheduler) -> Result<Message> {
    log::info!("Handling task list command, filter: {:?}", filter);
    let tasks = scheduler.list_tasks(filter).await;
    if tasks.is_empty() {
        return Ok(Message::Ack("No tasks found matching the criteria".to_string()));
    }
    log::debug!("Returning {} tasks", tasks.len());
    Ok(Message::TaskStatus(tasks))
}

async fn handle_task_info(task_id: String, scheduler: ResourceScheduler) -> Result<Message> {
    log::info!("Handling task info command, task ID: {}", task_id);
    match scheduler.get_task_status(&task_id).await {
        Some(task) => Ok(Message::TaskStatus(vec![task])),
        None => {
            log::warn!("Task with ID {} not found", task_id);
            Ok(Message::Error(format!("Task with ID {} not found", task_id)))
        }
    }
}

/// Cancellation is cooperative: a shell task keeps running until it exits
/// or hits its deadline, but its record ends as `cancelled`.
async fn handle_task_cancel(task_id: String, scheduler: ResourceScheduler) -> Result<Message> {
    log::info!("Handling task cancel command, task ID: {}", task_id);
    if scheduler.cancel_task(&task_id).await {
        Ok(Message::Ack(format!("Task {} marked as cancelled", task_id)))
    } else {
        Ok(Message::Error(format!("Task {} is not running", task_id)))
    }
}
