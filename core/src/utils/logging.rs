// core/src/utils/logging.rs
use anyhow::{Context, Result};
use log::LevelFilter;

/// Installs the process-wide logger, appending
/// `<local time> - <LEVEL> - <message>` lines to `log_file`.
pub fn init(log_file: &str, level: LevelFilter) -> Result<()> {
    let file = fern::log_file(log_file)
        .with_context(|| format!("Failed to open log file: {}", log_file))?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(file)
        .apply()
        .context("Failed to install logger")?;
    Ok(())
}

/// Maps a config string to a level, defaulting to `Info`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}
