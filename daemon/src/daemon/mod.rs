// daemon/src/daemon/mod.rs
pub mod admission;
pub mod breaker;
pub mod handlers;
pub mod queue;
pub mod scheduler;
pub mod shell;
pub mod state;
pub mod task;

use anyhow::{Context, Result};
use handlers::{handle_stats_command, handle_submit_command, handle_task_command};
use scheduler::ResourceScheduler;
use std::path::Path;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use warden_core::rpc::message::{DaemonAction, Message};
use warden_core::rpc::{read_frame, write_frame};
use warden_core::{HostMonitor, MemorySink, SchedulerConfig, SinkKind};

type ShutdownSender = watch::Sender<bool>;

/// Binds the control socket and serves until a Stop command arrives.
pub async fn start(sock_path: &str, config: SchedulerConfig) -> Result<()> {
    log::info!("Daemon starting, attempting to listen on socket: {}", sock_path);

    if Path::new(sock_path).exists() {
        log::warn!("Socket file {} already exists, attempting to remove.", sock_path);
        tokio::fs::remove_file(sock_path)
            .await
            .with_context(|| format!("Failed to remove existing socket file: {}", sock_path))?;
    }

    let listener = UnixListener::bind(sock_path)
        .with_context(|| format!("Failed to bind to socket: {}", sock_path))?;
    log::info!("Successfully bound to socket: {}", sock_path);

    let scheduler = build_scheduler(config);
    let result = serve(listener, scheduler).await;

    if let Err(e) = tokio::fs::remove_file(sock_path).await {
        log::warn!("Failed to remove socket file during shutdown {}: {}", sock_path, e);
    }
    log::info!("Daemon has shut down.");
    result
}

/// Scheduler over the host monitor, with the configured sink if any.
pub fn build_scheduler(config: SchedulerConfig) -> ResourceScheduler {
    let provider = Arc::new(HostMonitor::new());
    match config.metrics_sink {
        SinkKind::None => ResourceScheduler::new(config, provider),
        SinkKind::Memory => {
            let sink = Arc::new(MemorySink::new(config.history_limit));
            ResourceScheduler::with_sink(config, provider, sink)
        }
    }
}

/// Starts `scheduler`, answers requests on `listener`, and stops the
/// scheduler once a Stop command has been acknowledged.
pub async fn serve(listener: UnixListener, scheduler: ResourceScheduler) -> Result<()> {
    scheduler.start().await.context("Failed to start scheduler")?;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    log::info!("Daemon ready and listening for connections.");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        log::debug!("Accepted new connection");
                        let scheduler = scheduler.clone();
                        let shutdown_tx = shutdown_tx.clone();
                        tokio::spawn(async move {
                            let result = handle_connection(stream, scheduler, shutdown_tx).await;
                            if let Err(e) = result {
                                log::error!("Error handling connection: {:#}", e);
                            }
                        });
                    }
                    Err(e) => log::error!("Failed to accept connection: {}", e),
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    log::info!("Shutdown signal received, stopping listener.");
                    break;
                }
            }
        }
    }

    log::info!("Daemon shutting down...");
    scheduler.stop().await.context("Failed to stop scheduler")?;
    Ok(())
}

async fn handle_connection(
    mut stream: UnixStream,
    scheduler: ResourceScheduler,
    shutdown_tx: ShutdownSender,
) -> Result<()> {
    let message = read_frame(&mut stream).await?;

    let reply = match message {
        Message::DaemonCommand(DaemonAction::Stop) => {
            log::info!("Received Stop command.");
            if shutdown_tx.send(true).is_err() {
                log::error!("Failed to send shutdown signal: receiver dropped?");
                Message::Error("Failed to initiate shutdown".to_string())
            } else {
                Message::Ack("Shutdown initiated".to_string())
            }
        }
        Message::DaemonCommand(DaemonAction::Status) => {
            log::info!("Received Status command.");
            Message::Ack(status(&scheduler).await)
        }
        Message::SubmitCommand(action) => {
            reply_or_error("SubmitCommand", handle_submit_command(action, scheduler).await)
        }
        Message::TaskCommand(action) => {
            reply_or_error("TaskCommand", handle_task_command(action, scheduler).await)
        }
        Message::StatsCommand(action) => {
            reply_or_error("StatsCommand", handle_stats_command(action, scheduler).await)
        }
        Message::Submitted(_)
        | Message::TaskStatus(_)
        | Message::Stats(_)
        | Message::Metrics(_)
        | Message::Ack(_)
        | Message::Error(_) => {
            log::warn!("Received a reply message type from client, unexpected in a request.");
            Message::Error("Daemon received unexpected reply message type".to_string())
        }
    };

    write_frame(&mut stream, &reply).await?;
    log::debug!("Sent reply and closing connection.");
    Ok(())
}

fn reply_or_error(kind: &str, result: Result<Message>) -> Message {
    result.unwrap_or_else(|e| {
        log::error!("Error handling {}: {:#}", kind, e);
        Message::Error(format!("Error handling {}: {}", kind, e))
    })
}

/// Human-readable summary for the Status command.
async fn status(scheduler: &ResourceScheduler) -> String {
    let stats = scheduler.get_resource_stats().await;
    let metrics = &stats.current_metrics;
    let breaker = if stats.circuit_breaker_open { "OPEN" } else { "closed" };

    let mut status = format!(
        "Daemon status\n==================\n\n\
         Scheduler running: {}\nActive tasks: {}/{}\nQueued tasks: {}/{}\n",
        scheduler.is_running().await,
        stats.active_tasks,
        stats.quota.max_concurrent_tasks,
        stats.queue_size,
        stats.quota.max_queue_size,
    );
    status.push_str(&format!(
        "\nHost CPU: {:.1}% (limit {:.1}%)\nHost memory: {:.0}MB, {:.1}% (limit {:.0}MB)\n",
        metrics.cpu_percent,
        stats.quota.max_cpu_percent,
        metrics.memory_used_mb,
        metrics.memory_percent,
        stats.quota.max_memory_mb,
    ));
    status.push_str(&format!(
        "\nCircuit breaker: {} ({} consecutive overloads)\n",
        breaker, stats.consecutive_overloads
    ));

    if !stats.task_type_stats.is_empty() {
        status.push_str("\nRecent task types:\n");
        for (task_type, type_stats) in &stats.task_type_stats {
            status.push_str(&format!(
                "- {}: {} runs, avg {:.2}s, {:.0}% completed\n",
                task_type,
                type_stats.count,
                type_stats.avg_duration_secs,
                type_stats.completion_rate * 100.0
            ));
        }
    }
    status
}
