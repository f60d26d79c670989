//! Task lifecycle model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, pipeline not yet scheduled
    Pending,
    /// Pipeline is running
    Processing,
    /// All stages succeeded
    Completed,
    /// A stage failed
    Failed,
}

impl TaskStatus {
    /// Whether this state admits no further transitions
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Allowed edges: pending -> processing, processing -> processing
    /// (progress updates), processing -> completed, processing -> failed.
    #[must_use]
    pub fn can_transition(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }
}

/// Artifact references produced by a completed task, tagged by job kind so
/// consumers can branch exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutput {
    /// Subtitle generation output
    Subtitles {
        /// Subtitle file name, resolvable via the download endpoint
        subtitle_file: String,
        /// English translation, present when translation was requested
        #[serde(skip_serializing_if = "Option::is_none")]
        english_subtitle_file: Option<String>,
        /// Detected or requested language
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    /// Dataset creation output
    Dataset {
        /// JSONL dataset file name
        dataset_file: String,
        /// Number of records written
        items_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        video_title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        video_duration_secs: Option<f64>,
    },
}

/// A tracked job and its lifecycle state.
///
/// The store hands out clones as snapshots; only the executor that owns a
/// task mutates it, and only through [`crate::store::TaskStore::update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque unique identifier, assigned at creation
    pub id: String,
    pub status: TaskStatus,
    /// Cumulative progress in [0, 100]; 100 exactly when completed
    pub progress: u8,
    /// Human-readable description of the current stage
    pub message: String,
    /// Present only when completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskOutput>,
    /// Present only when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a fresh pending task
    #[must_use]
    pub fn new(id: String) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            progress: 0,
            message: "Waiting to start...".to_string(),
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}
