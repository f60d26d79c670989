//! Authoritative task state storage
//!
//! Holds every submitted task keyed by identifier. The outer map allows
//! concurrent access across tasks; a per-entry mutex serializes writes to any
//! single task, so an update is never lost. Every update is validated against
//! the forward-only state machine before it is committed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::task::{Task, TaskStatus};

/// Task store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid task transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

/// Concurrent store of all submitted tasks
#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<String, Arc<Mutex<Task>>>>>,
}

impl TaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::with_capacity(64))),
        }
    }

    /// Create a new pending task and return its initial snapshot
    pub async fn create(&self) -> Task {
        let task = Task::new(Uuid::new_v4().to_string());
        let snapshot = task.clone();
        self.tasks
            .write()
            .await
            .insert(task.id.clone(), Arc::new(Mutex::new(task)));
        snapshot
    }

    /// Get the current snapshot of a task
    pub async fn get(&self, id: &str) -> Result<Task, StoreError> {
        let entry = self.entry(id).await?;
        let task = entry.lock().await;
        Ok(task.clone())
    }

    /// Apply a state transition atomically and return the new snapshot.
    ///
    /// The mutator edits a working copy; the change is committed only if it
    /// respects the forward-only state machine, monotone progress, and the
    /// result/error field discipline. An invalid mutation leaves the stored
    /// task untouched and returns [`StoreError::InvalidTransition`].
    pub async fn update<F>(&self, id: &str, mutate: F) -> Result<Task, StoreError>
    where
        F: FnOnce(&mut Task),
    {
        let entry = self.entry(id).await?;
        let mut task = entry.lock().await;

        let mut next = task.clone();
        mutate(&mut next);
        validate_transition(&task, &next)?;

        *task = next.clone();
        Ok(next)
    }

    /// Drop terminal tasks older than the retention window. Returns how many
    /// were removed. Non-terminal tasks are never removed.
    pub async fn remove_expired(&self, retention: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(retention.as_secs() as i64);
        let mut tasks = self.tasks.write().await;

        let mut expired = Vec::new();
        for (id, entry) in tasks.iter() {
            let task = entry.lock().await;
            if task.status.is_terminal() && task.created_at < cutoff {
                expired.push(id.clone());
            }
        }
        for id in &expired {
            tasks.remove(id);
        }
        expired.len()
    }

    /// Number of tracked tasks
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    async fn entry(&self, id: &str) -> Result<Arc<Mutex<Task>>, StoreError> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that `next` is a legal successor of `current`
fn validate_transition(current: &Task, next: &Task) -> Result<(), StoreError> {
    let invalid = || StoreError::InvalidTransition {
        from: current.status,
        to: next.status,
    };

    // Identity fields are immutable
    if next.id != current.id || next.created_at != current.created_at {
        return Err(invalid());
    }

    // Terminal tasks admit no further updates of any kind
    if current.status.is_terminal() {
        return Err(invalid());
    }

    if !current.status.can_transition(next.status) {
        return Err(invalid());
    }

    // Progress is monotone and bounded
    if next.progress < current.progress || next.progress > 100 {
        return Err(invalid());
    }

    // Field discipline per status: result iff completed, error iff failed,
    // progress 100 iff completed
    match next.status {
        TaskStatus::Completed => {
            if next.progress != 100 || next.result.is_none() || next.error.is_some() {
                return Err(invalid());
            }
        }
        TaskStatus::Failed => {
            if next.error.is_none() || next.result.is_some() || next.progress == 100 {
                return Err(invalid());
            }
        }
        TaskStatus::Pending | TaskStatus::Processing => {
            if next.progress == 100 || next.result.is_some() || next.error.is_some() {
                return Err(invalid());
            }
        }
    }

    Ok(())
}
