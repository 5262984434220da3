// core/src/host/mod.rs
pub mod monitor;

pub use monitor::{HostMonitor, MetricsProvider};
