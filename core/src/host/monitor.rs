// core/src/host/monitor.rs
use anyhow::{anyhow, Result};
use std::sync::Mutex;
use sysinfo::System;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Source of host CPU and memory readings.
pub trait MetricsProvider: Send + Sync {
    /// Host-wide CPU utilisation in percent.
    fn sample_cpu_percent(&self) -> Result<f64>;

    /// Host memory in use as `(used_mb, percent)`.
    fn sample_memory(&self) -> Result<(f64, f64)>;
}

/// [`MetricsProvider`] backed by `sysinfo`.
///
/// CPU usage is computed between consecutive refreshes, so the first
/// reading after construction is 0.
#[derive(Debug)]
pub struct HostMonitor {
    system: Mutex<System>,
}

impl HostMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self { system: Mutex::new(system) }
    }
}

impl Default for HostMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for HostMonitor {
    fn sample_cpu_percent(&self) -> Result<f64> {
        let mut system = self.system.lock().map_err(|_| anyhow!("Host monitor lock poisoned"))?;
        system.refresh_cpu_usage();
        Ok(system.global_cpu_usage() as f64)
    }

    fn sample_memory(&self) -> Result<(f64, f64)> {
        let mut system = self.system.lock().map_err(|_| anyhow!("Host monitor lock poisoned"))?;
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(anyhow!("Host reported 0 total memory"));
        }
        let used = system.used_memory();
        let used_mb = used as f64 / BYTES_PER_MB;
        let percent = used as f64 / total as f64 * 100.0;
        Ok((used_mb, percent))
    }
}
