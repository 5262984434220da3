// cli/src/cli/mod.rs
mod daemon;
mod stats;
mod submit;
mod task;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{env, fs, path::{Path, PathBuf}};
use structopt::{clap::AppSettings, StructOpt};
use warden_core::utils::{DEFAULT_CONFIG_FILE, DEFAULT_SOCK_PATH};

use self::{daemon::DaemonCommand, stats::StatsCommand, submit::SubmitCommand, task::TaskCommand};

const LOCK_FILE_NAME: &str = "warden.lock";

#[derive(StructOpt, Debug)]
#[structopt(
    name = "warden",
    global_settings = &[AppSettings::DisableHelpSubcommand]
)]
pub enum AppCommand {
    /// Daemon process management
    #[structopt(name = "daemon")]
    Daemon(DaemonCommand),

    /// Task submission
    #[structopt(name = "submit")]
    Submit(SubmitCommand),

    /// Task inspection and cancellation
    #[structopt(name = "task")]
    Task(TaskCommand),

    /// Resource usage and scheduler statistics
    #[structopt(name = "stats")]
    Stats(StatsCommand),
}

impl AppCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            AppCommand::Daemon(cmd) => cmd.execute(),
            AppCommand::Submit(cmd) => cmd.execute(),
            AppCommand::Task(cmd) => cmd.execute(),
            AppCommand::Stats(cmd) => cmd.execute(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CliConfig {
    #[serde(rename = "sock-path", default = "default_sock_path")]
    sock_path: String,
}

fn default_sock_path() -> String {
    DEFAULT_SOCK_PATH.to_string()
}

fn resolve_config_path(config_override: Option<&str>) -> Result<PathBuf> {
    match config_override {
        Some(path) => Ok(Path::new(path).to_path_buf()),
        None => {
            let current_dir = env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(DEFAULT_CONFIG_FILE))
        }
    }
}

/// Reads `sock-path` from the daemon config.
fn get_socket_path(config_override: Option<&str>) -> Result<String> {
    let config_path = resolve_config_path(config_override)?;
    if !config_path.exists() {
        return Err(anyhow!("Config file not found at {}", config_path.display()));
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let config: CliConfig = serde_json::from_str(&config_content)
        .with_context(|| {
            format!("Failed to parse sock-path from config file: {}", config_path.display())
        })?;
    Ok(config.sock_path)
}

fn get_lock_file_path() -> Result<PathBuf> {
    env::current_dir()
        .map(|p| p.join(LOCK_FILE_NAME))
        .context("Failed to get current directory for lock file")
}

/// Milliseconds since the epoch as local wall-clock time.
fn format_millis(millis: u64) -> String {
    chrono::DateTime::from_timestamp_millis(millis as i64)
        .map(|utc| utc.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn socket_path_comes_from_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sock-path": "/tmp/custom.sock", "log-path": "/tmp/w.log"}}"#).unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(get_socket_path(Some(path)).unwrap(), "/tmp/custom.sock");
    }

    #[test]
    fn missing_sock_path_uses_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"log-path": "/tmp/w.log"}}"#).unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(get_socket_path(Some(path)).unwrap(), DEFAULT_SOCK_PATH);
    }

    #[test]
    fn missing_config_is_an_error() {
        assert!(get_socket_path(Some("/nonexistent/warden.json")).is_err());
    }

    #[test]
    fn invalid_millis_render_as_dash() {
        assert_eq!(format_millis(i64::MAX as u64 + 1), "-");
        assert_ne!(format_millis(0), "-");
    }
}
