// cli/src/cli/daemon.rs
use crate::cli::{get_lock_file_path, get_socket_path, resolve_config_path};
use anyhow::{anyhow, Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use std::{env, fs, thread};
use structopt::StructOpt;
use warden_core::rpc::{message::{DaemonAction, Message}, request_reply};

const DAEMON_BINARY: &str = "warden-daemon";
const STARTUP_GRACE: Duration = Duration::from_millis(500);

#[derive(StructOpt, Debug)]
pub enum DaemonCommand {
    /// Launch warden-daemon in the background
    #[structopt(name = "start")]
    Start {
        #[structopt(long)]
        config: Option<String>,
    },

    /// Ask the daemon to shut down
    #[structopt(name = "stop")]
    Stop {
        #[structopt(long)]
        config: Option<String>,
    },

    /// Print the daemon's status summary
    #[structopt(name = "status")]
    Status {
        #[structopt(long)]
        config: Option<String>,
    },
}

impl DaemonCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Start { config } => start(config.as_deref()),
            Self::Stop { config } => stop(config.as_deref()),
            Self::Status { config } => {
                let summary = query_status(&get_socket_path(config.as_deref())?)?;
                println!("{}", summary.green());
                Ok(())
            }
        }
    }
}

/// Sends Status and returns the daemon's summary text.
fn query_status(sock_path: &str) -> Result<String> {
    match request_reply(sock_path, &Message::DaemonCommand(DaemonAction::Status)) {
        Ok(Message::Ack(summary)) => Ok(summary),
        Ok(Message::Error(err_msg)) => Err(anyhow!("Daemon reported an error: {}", err_msg)),
        Ok(other) => Err(anyhow!("Unexpected reply for status request: {:?}", other)),
        Err(e) => Err(e.context(format!("Daemon not reachable at {}", sock_path))),
    }
}

fn daemon_executable() -> Result<PathBuf> {
    let exe_path = env::current_exe().context("Failed to locate the warden executable")?;
    let exe = exe_path
        .parent()
        .map(|dir| dir.join(DAEMON_BINARY))
        .ok_or_else(|| anyhow!("Failed to get parent directory of executable"))?;
    if !exe.exists() {
        return Err(anyhow!("{} Daemon executable not found at {}", "[ERROR]".red(), exe.display()));
    }
    Ok(exe)
}

/// A lock file left behind by a daemon that no longer answers is removed.
fn clear_stale_lock(lock_file: &Path, config: Option<&str>) -> Result<bool> {
    if !lock_file.exists() {
        return Ok(false);
    }
    let alive = get_socket_path(config).and_then(|sock| query_status(&sock)).is_ok();
    if alive {
        return Ok(true);
    }
    println!("{} Removing stale lock file {}", "[WARN]".yellow(), lock_file.display());
    fs::remove_file(lock_file)
        .with_context(|| format!("Failed to remove stale lock file: {}", lock_file.display()))?;
    Ok(false)
}

fn start(config: Option<&str>) -> Result<()> {
    let lock_file = get_lock_file_path()?;
    if clear_stale_lock(&lock_file, config)? {
        println!("{} Daemon is already running.", "[INFO]".blue());
        return Ok(());
    }

    let config_path = resolve_config_path(config)?;
    if !config_path.exists() {
        return Err(anyhow!("{} Config file not found: {}", "[ERROR]".red(), config_path.display()));
    }
    let daemon_exe = daemon_executable()?;

    let child = Command::new(&daemon_exe)
        .arg(&config_path)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Failed to start daemon process: {}", daemon_exe.display()))?;
    let pid = child.id().to_string();
    fs::write(&lock_file, &pid)
        .with_context(|| format!("Failed to write lock file: {}", lock_file.display()))?;
    println!(
        "{} {} started (PID {}) with {}",
        "[SUCCESS]".green(),
        DAEMON_BINARY,
        pid.bold(),
        config_path.display().to_string().cyan()
    );

    thread::sleep(STARTUP_GRACE);
    match get_socket_path(config).and_then(|sock| query_status(&sock)) {
        Ok(summary) => println!("{}", summary.green()),
        Err(e) => println!("{} Daemon launched but not answering yet: {:#}", "[WARN]".yellow(), e),
    }
    Ok(())
}

fn stop(config: Option<&str>) -> Result<()> {
    let lock_file = get_lock_file_path()?;
    let sock_path = get_socket_path(config)?;

    let reply = request_reply(&sock_path, &Message::DaemonCommand(DaemonAction::Stop));
    let remove_lock = || -> Result<()> {
        if lock_file.exists() {
            fs::remove_file(&lock_file)
                .with_context(|| format!("Failed to remove lock file: {}", lock_file.display()))?;
        }
        Ok(())
    };

    match reply {
        Ok(Message::Ack(msg)) => {
            remove_lock()?;
            println!("{} {}", "[SUCCESS]".green(), msg.italic());
            Ok(())
        }
        Ok(Message::Error(err_msg)) => {
            Err(anyhow!("Daemon reported error during stop: {}", err_msg))
        }
        Ok(other) => Err(anyhow!("Unexpected reply from daemon during stop: {:?}", other)),
        Err(e) => {
            remove_lock()?;
            Err(e.context(format!("Daemon not reachable at {}", sock_path)))
        }
    }
}
