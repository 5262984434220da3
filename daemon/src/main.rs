// daemon/src/main.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path};
use warden_core::utils::{logging, DEFAULT_SOCK_PATH};
use warden_core::SchedulerConfig;
use warden_daemon::daemon;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Config {
    #[serde(default = "default_log_level")]
    log_level: String,
    log_path: String,
    #[serde(default = "default_sock_path")]
    sock_path: String,
    #[serde(default)]
    scheduler: SchedulerConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sock_path() -> String {
    DEFAULT_SOCK_PATH.to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        // Logger is not up yet.
        eprintln!("Usage: warden-daemon <config_path>");
        return Err(anyhow::anyhow!("Usage: warden-daemon <config_path>"));
    }
    let config_path = &args[1];

    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path))?;
    let config: Config = serde_json::from_str(&config_content)
        .with_context(|| format!("Failed to parse config file: {}", config_path))?;

    if let Some(parent) = Path::new(&config.log_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
    }

    logging::init(&config.log_path, logging::parse_level(&config.log_level))
        .context("Failed to initialize logger")?;

    daemon::start(&config.sock_path, config.scheduler).await
}
