// daemon/src/daemon/handlers/stats_handler.rs
use crate::daemon::scheduler::ResourceScheduler;
use anyhow::Result;
use warden_core::rpc::message::{Message, StatsAction};

pub async fn handle_stats_command(
    action: StatsAction,
    scheduler: ResourceScheduler,
) -> Result<Message> {
    match action {
        StatsAction::Resources => {
            log::debug!("Handling resource stats request");
            Ok(Message::Stats(scheduler.get_resource_stats().await))
        }
        StatsAction::Metrics => {
            log::debug!("Handling system metrics request");
            Ok(Message::Metrics(scheduler.get_system_metrics().await))
        }
    }
}
