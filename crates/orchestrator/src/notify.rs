//! Per-task progress fan-out
//!
//! One bounded broadcast channel per task identifier. Publishing never blocks
//! on a slow subscriber: a lagging receiver skips the oldest buffered
//! snapshots and keeps reading. Once the terminal snapshot has been handed to
//! the channel the sender is dropped, so every subscriber drains what is
//! buffered and then observes end-of-stream.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::task::Task;

/// Fan-out hub pushing task snapshots to subscribers
#[derive(Clone)]
pub struct ProgressHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<Task>>>>,
    capacity: usize,
}

impl ProgressHub {
    /// Create a hub with the default per-task buffer (64 snapshots)
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Subscribe to snapshots for one task. The channel is created on first
    /// use; callers are expected to have checked that the task exists.
    pub async fn subscribe(&self, task_id: &str) -> broadcast::Receiver<Task> {
        let mut channels = self.channels.write().await;
        channels
            .entry(task_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver a snapshot to every current subscriber of its task.
    ///
    /// A terminal snapshot also retires the channel, closing it for all
    /// subscribers once they have drained it.
    pub async fn publish(&self, snapshot: &Task) {
        if snapshot.status.is_terminal() {
            let mut channels = self.channels.write().await;
            if let Some(tx) = channels.remove(&snapshot.id) {
                // Send errors mean no active receivers
                let _ = tx.send(snapshot.clone());
            }
        } else {
            let channels = self.channels.read().await;
            if let Some(tx) = channels.get(&snapshot.id) {
                let _ = tx.send(snapshot.clone());
            }
        }
    }

    /// Number of subscribers currently attached to a task's channel
    pub async fn subscriber_count(&self, task_id: &str) -> usize {
        self.channels
            .read()
            .await
            .get(task_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drop channels nobody is listening to
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}
