// core/src/sink.rs
//! Optional destinations for serialized scheduler records.
//!
//! Sinks are fire-and-forget from the scheduler's point of view: a failing
//! sink is logged by the caller and never changes a task outcome.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Stores `record` under `key`, expiring after `ttl`.
    async fn put(&self, key: &str, record: &str, ttl: Duration) -> Result<()>;

    /// Adds `record` to the time-ordered rolling `window`.
    async fn append(&self, window: &str, timestamp: u64, record: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemorySinkInner {
    entries: HashMap<String, (String, Instant)>,
    windows: HashMap<String, VecDeque<(u64, String)>>,
}

/// In-process sink keeping keyed records with expiry and bounded windows.
#[derive(Debug)]
pub struct MemorySink {
    inner: Mutex<MemorySinkInner>,
    window_limit: usize,
}

impl MemorySink {
    pub fn new(window_limit: usize) -> Self {
        Self { inner: Mutex::new(MemorySinkInner::default()), window_limit }
    }

    /// Returns the live record for `key`, dropping it if expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock().ok()?;
        let expired = *expires_at_of(&inner, key)? <= Instant::now();
        if expired {
            inner.entries.remove(key);
            return None;
        }
        inner.entries.get(key).map(|(record, _)| record.clone())
    }

    /// Window contents, oldest first.
    pub fn window(&self, window: &str) -> Vec<(u64, String)> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.windows.get(window).map(|w| w.iter().cloned().collect()))
            .unwrap_or_default()
    }
}

fn expires_at_of<'a>(inner: &'a MemorySinkInner, key: &str) -> Option<&'a Instant> {
    inner.entries.get(key).map(|(_, expires_at)| expires_at)
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl MetricsSink for MemorySink {
    async fn put(&self, key: &str, record: &str, ttl: Duration) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory sink lock poisoned"))?;
        let now = Instant::now();
        inner.entries.retain(|_, (_, expires_at)| *expires_at > now);
        inner.entries.insert(key.to_string(), (record.to_string(), now + ttl));
        Ok(())
    }

    async fn append(&self, window: &str, timestamp: u64, record: &str) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory sink lock poisoned"))?;
        let entries = inner.windows.entry(window.to_string()).or_default();
        let at = entries.partition_point(|(ts, _)| *ts <= timestamp);
        entries.insert(at, (timestamp, record.to_string()));
        while entries.len() > self.window_limit {
            entries.pop_front();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn put_expires_after_ttl() {
        let sink = MemorySink::default();
        sink.put("task_metrics:a", "{}", Duration::from_secs(10)).await.unwrap();
        assert_eq!(sink.get("task_metrics:a").as_deref(), Some("{}"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(sink.get("task_metrics:a"), None);
    }

    #[tokio::test]
    async fn window_is_time_ordered_and_bounded() {
        let sink = MemorySink::new(2);
        sink.append("timeline", 30, "c").await.unwrap();
        sink.append("timeline", 10, "a").await.unwrap();
        sink.append("timeline", 20, "b").await.unwrap();

        let window = sink.window("timeline");
        assert_eq!(window, vec![(20, "b".to_string()), (30, "c".to_string())]);
        assert!(sink.window("missing").is_empty());
    }
}
