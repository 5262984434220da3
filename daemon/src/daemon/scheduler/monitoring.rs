// daemon/src/daemon/scheduler/monitoring.rs
use super::{ResourceScheduler, SYSTEM_METRICS_KEY};
use crate::daemon::admission::is_overloaded;
use crate::daemon::breaker::BreakerTransition;
use log::{info, warn};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use warden_core::SystemMetrics;

const SNAPSHOT_TTL: Duration = Duration::from_secs(60);

impl ResourceScheduler {
    pub(super) async fn run_monitor(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.inner.config.monitor_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Resource monitor started.");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.monitor_tick().await;
                }
            }
        }

        info!("Resource monitor stopped.");
    }

    /// One monitor pass: sample, publish, feed the breaker, forward the
    /// snapshot. The monitor loop calls this once per interval.
    pub async fn monitor_tick(&self) -> SystemMetrics {
        let metrics = self.sample_metrics().await;
        self.inner.state.publish_metrics(metrics.clone()).await;

        let config = &self.inner.config;
        let overloaded = is_overloaded(&config.quota, &metrics, config.overload_factor);
        let transition = self.inner.state.record_sample(overloaded, config.breaker_threshold).await;
        if let BreakerTransition::Opened { generation } = transition {
            warn!(
                "Circuit breaker opened after {} overloaded samples (cpu {:.1}%, memory {:.0}MB).",
                config.breaker_threshold, metrics.cpu_percent, metrics.memory_used_mb
            );
            self.schedule_breaker_close(generation);
        }

        self.forward_snapshot(&metrics).await;
        metrics
    }

    fn schedule_breaker_close(&self, generation: u64) {
        let state = self.inner.state.clone();
        let cooldown = self.inner.config.breaker_cooldown();
        tokio::spawn(async move {
            sleep(cooldown).await;
            if state.close_breaker(generation).await {
                info!("Circuit breaker closed after {:?} cooldown.", cooldown);
            }
        });
    }

    async fn forward_snapshot(&self, metrics: &SystemMetrics) {
        let Some(sink) = &self.inner.sink else {
            return;
        };
        match serde_json::to_string(metrics) {
            Ok(payload) => {
                if let Err(e) = sink.put(SYSTEM_METRICS_KEY, &payload, SNAPSHOT_TTL).await {
                    warn!("Metrics sink rejected host snapshot: {:#}", e);
                }
            }
            Err(e) => warn!("Failed to serialize host snapshot: {}", e),
        }
    }
}
