// cli/src/cli/stats.rs
use crate::cli::{format_millis, get_socket_path};
use anyhow::{anyhow, Result};
use colored::*;
use structopt::StructOpt;
use warden_core::rpc::message::{Message, StatsAction};
use warden_core::rpc::request_reply;
use warden_core::{ResourceStats, SystemMetrics};

#[derive(StructOpt, Debug)]
pub enum StatsCommand {
    /// Quota, queue, breaker state and per-type aggregates
    #[structopt(name = "resources")]
    Resources {
        #[structopt(long)]
        config: Option<String>,
    },

    /// Latest host metrics snapshot
    #[structopt(name = "metrics")]
    Metrics {
        #[structopt(long)]
        config: Option<String>,
    },
}

impl StatsCommand {
    pub fn execute(self) -> Result<()> {
        let (action, config) = match self {
            Self::Resources { config } => (StatsAction::Resources, config),
            Self::Metrics { config } => (StatsAction::Metrics, config),
        };
        let socket_path = get_socket_path(config.as_deref())?;

        match request_reply(&socket_path, &Message::StatsCommand(action))? {
            Message::Stats(stats) => print_stats(&stats),
            Message::Metrics(metrics) => print_metrics(&metrics),
            Message::Error(err_msg) => return Err(anyhow!("Daemon returned error: {}", err_msg)),
            other => return Err(anyhow!("Received unexpected reply from daemon: {:?}", other)),
        }
        Ok(())
    }
}

fn print_metrics(metrics: &SystemMetrics) {
    println!("{} {}", "Sampled at:".bold(), format_millis(metrics.timestamp));
    println!("{} {:.1}%", "CPU:".bold(), metrics.cpu_percent);
    println!(
        "{} {:.0}MB ({:.1}%)",
        "Memory:".bold(),
        metrics.memory_used_mb,
        metrics.memory_percent
    );
    println!(
        "{} {} active, {} queued",
        "Tasks:".bold(),
        metrics.active_tasks,
        metrics.queued_tasks
    );
}

fn print_stats(stats: &ResourceStats) {
    print_metrics(&stats.current_metrics);

    let quota = &stats.quota;
    println!(
        "{} cpu {:.1}%, memory {:.0}MB, {} concurrent, {} queued",
        "Quota:".bold(),
        quota.max_cpu_percent,
        quota.max_memory_mb,
        quota.max_concurrent_tasks,
        quota.max_queue_size
    );
    let breaker = if stats.circuit_breaker_open { "OPEN".red() } else { "closed".green() };
    println!(
        "{} {} ({} consecutive overloads)",
        "Breaker:".bold(),
        breaker,
        stats.consecutive_overloads
    );

    if stats.task_type_stats.is_empty() {
        return;
    }
    println!();
    println!("{:<16} {:>6} {:>12} {:>10} {:>10}", "Type", "Runs", "Avg time", "Avg CPU", "Success");
    println!("{:-<58}", "");
    for (task_type, type_stats) in &stats.task_type_stats {
        println!(
            "{:<16} {:>6} {:>11.2}s {:>9.1}% {:>9.0}%",
            task_type,
            type_stats.count,
            type_stats.avg_duration_secs,
            type_stats.avg_cpu_usage,
            type_stats.completion_rate * 100.0
        );
    }
}
