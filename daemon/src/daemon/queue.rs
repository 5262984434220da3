// daemon/src/daemon/queue.rs
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout_at, Instant};
use warden_core::TaskPriority;

struct QueueEntry<T> {
    priority: TaskPriority,
    enqueued_at: Instant,
    seq: u64,
    item: T,
}

impl<T> QueueEntry<T> {
    fn key(&self) -> (TaskPriority, Instant, u64) {
        (self.priority, self.enqueued_at, self.seq)
    }
}

impl<T> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for QueueEntry<T> {}

impl<T> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueueEntry<T> {
    // Reversed: BinaryHeap pops the greatest, we want the smallest key.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Pending work ordered by `(priority, enqueue time, sequence)`.
pub struct PriorityQueue<T> {
    heap: Mutex<BinaryHeap<QueueEntry<T>>>,
    notify: Notify,
    seq: AtomicU64,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self { heap: Mutex::new(BinaryHeap::new()), notify: Notify::new(), seq: AtomicU64::new(0) }
    }

    /// Enqueues with a fresh enqueue time, so a re-pushed item lands behind
    /// everything of its class already waiting.
    pub async fn push(&self, priority: TaskPriority, item: T) {
        let entry = QueueEntry {
            priority,
            enqueued_at: Instant::now(),
            seq: self.seq.fetch_add(1, AtomicOrdering::Relaxed),
            item,
        };
        self.heap.lock().await.push(entry);
        self.notify.notify_one();
    }

    pub async fn try_pop(&self) -> Option<(TaskPriority, T)> {
        self.heap.lock().await.pop().map(|entry| (entry.priority, entry.item))
    }

    /// Waits up to `wait` for an item. A wait past the clock's range has no
    /// deadline.
    pub async fn pop_timeout(&self, wait: Duration) -> Option<(TaskPriority, T)> {
        let deadline = Instant::now().checked_add(wait);
        loop {
            if let Some(next) = self.try_pop().await {
                return Some(next);
            }
            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, self.notify.notified()).await.is_err() {
                        return self.try_pop().await;
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn drain(queue: &PriorityQueue<&'static str>) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Some((_, item)) = queue.try_pop().await {
            out.push(item);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn strict_priority_then_fifo() {
        let queue = PriorityQueue::new();
        queue.push(TaskPriority::Low, "low").await;
        queue.push(TaskPriority::High, "high-1").await;
        queue.push(TaskPriority::Critical, "critical").await;
        queue.push(TaskPriority::High, "high-2").await;
        queue.push(TaskPriority::Medium, "medium").await;

        assert_eq!(drain(&queue).await, vec!["critical", "high-1", "high-2", "medium", "low"]);
    }

    #[tokio::test(start_paused = true)]
    async fn requeued_item_goes_behind_its_class() {
        let queue = PriorityQueue::new();
        queue.push(TaskPriority::High, "a").await;
        queue.push(TaskPriority::High, "b").await;
        queue.push(TaskPriority::Low, "c").await;

        let (priority, first) = queue.try_pop().await.unwrap();
        assert_eq!(first, "a");
        tokio::time::advance(Duration::from_millis(100)).await;
        queue.push(priority, first).await;

        assert_eq!(drain(&queue).await, vec!["b", "a", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pop_timeout_returns_none_when_empty() {
        let queue: PriorityQueue<u32> = PriorityQueue::new();
        let started = Instant::now();
        assert!(queue.pop_timeout(Duration::from_secs(1)).await.is_none());
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn pop_timeout_wakes_on_push() {
        let queue = Arc::new(PriorityQueue::new());
        let producer = Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            producer.push(TaskPriority::Medium, 7u32).await;
        });

        let popped = queue.pop_timeout(Duration::from_secs(5)).await;
        assert_eq!(popped, Some((TaskPriority::Medium, 7)));
        assert!(queue.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_wait_still_wakes_on_push() {
        let queue = Arc::new(PriorityQueue::new());
        let producer = Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            producer.push(TaskPriority::Low, 9u32).await;
        });

        let popped = queue.pop_timeout(Duration::MAX).await;
        assert_eq!(popped, Some((TaskPriority::Low, 9)));
    }
}
