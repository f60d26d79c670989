//! Pipeline execution
//!
//! Drives one task's stages strictly in order, off the caller's request path.
//! After every stage the task store is updated and the new snapshot is
//! published, so observers see each stage boundary. The first stage failure
//! ends the run in the `failed` state; stages are never retried.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::notify::ProgressHub;
use crate::stage::{Stage, StageContext, StageError};
use crate::store::{StoreError, TaskStore};
use crate::task::{Task, TaskStatus};

/// Executes pipelines against the task store and progress hub
#[derive(Clone)]
pub struct PipelineExecutor {
    store: TaskStore,
    hub: ProgressHub,
}

impl PipelineExecutor {
    #[must_use]
    pub fn new(store: TaskStore, hub: ProgressHub) -> Self {
        Self { store, hub }
    }

    /// Schedule a pipeline run. Returns as soon as the run is spawned; the
    /// task reaches a terminal state on its own.
    pub fn spawn(&self, ctx: StageContext, stages: Vec<Arc<dyn Stage>>) {
        let executor = self.clone();
        tokio::spawn(async move {
            executor.run(ctx, stages).await;
        });
    }

    /// Run all stages in order until completion or first failure
    pub async fn run(&self, mut ctx: StageContext, stages: Vec<Arc<dyn Stage>>) {
        let task_id = ctx.task_id.clone();
        let total = stages.len();

        if self
            .transition(&task_id, |t| {
                t.status = TaskStatus::Processing;
                t.progress = 0;
                t.message = "Starting...".to_string();
            })
            .await
            .is_err()
        {
            return;
        }

        if total == 0 {
            self.fail(&task_id, "Pipeline has no stages".to_string()).await;
            return;
        }

        for (index, stage) in stages.into_iter().enumerate() {
            info!(
                "Task {}: running stage {} ({}/{})",
                task_id,
                stage.name(),
                index + 1,
                total
            );

            let (returned_ctx, outcome) = match run_isolated(stage.clone(), ctx).await {
                Ok(pair) => pair,
                Err(join_err) => {
                    // A panicking stage fails the task instead of unwinding
                    // into the executor
                    error!("Task {}: stage {} panicked: {}", task_id, stage.name(), join_err);
                    self.fail(&task_id, format!("Stage {} aborted unexpectedly", stage.name()))
                        .await;
                    return;
                }
            };
            ctx = returned_ctx;

            match outcome {
                Ok(message) => {
                    if index + 1 < total {
                        let progress = stage_progress(index + 1, total);
                        if self
                            .transition(&task_id, |t| {
                                t.progress = progress;
                                t.message = message.clone();
                            })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    } else {
                        self.complete(&task_id, &mut ctx, message).await;
                    }
                }
                Err(stage_err) => {
                    warn!(
                        "Task {}: stage {} failed: {}",
                        task_id,
                        stage.name(),
                        stage_err
                    );
                    self.fail(&task_id, stage_err.detail).await;
                    return;
                }
            }
        }
    }

    /// Final-stage success: attach the produced output and complete the task
    async fn complete(&self, task_id: &str, ctx: &mut StageContext, message: String) {
        let Some(output) = ctx.artifacts.output.take() else {
            self.fail(task_id, "Pipeline produced no output".to_string())
                .await;
            return;
        };

        let _ = self
            .transition(task_id, |t| {
                t.status = TaskStatus::Completed;
                t.progress = 100;
                t.message = message.clone();
                t.result = Some(output.clone());
            })
            .await;
        info!("Task {} completed", task_id);
    }

    async fn fail(&self, task_id: &str, detail: String) {
        let _ = self
            .transition(task_id, |t| {
                t.status = TaskStatus::Failed;
                t.message = format!("Error: {detail}");
                t.error = Some(detail.clone());
            })
            .await;
        info!("Task {} failed", task_id);
    }

    /// Update the store and publish the new snapshot to subscribers.
    ///
    /// An invalid transition here is an internal-consistency fault: it is
    /// logged and stops the run, but is never surfaced to observers.
    async fn transition<F>(&self, task_id: &str, mutate: F) -> Result<Task, StoreError>
    where
        F: FnOnce(&mut Task),
    {
        match self.store.update(task_id, mutate).await {
            Ok(snapshot) => {
                self.hub.publish(&snapshot).await;
                Ok(snapshot)
            }
            Err(err) => {
                error!("Task {}: internal transition fault: {}", task_id, err);
                Err(err)
            }
        }
    }
}

/// Run one stage in its own task so an unexpected fault inside the adapter
/// cannot propagate beyond pipeline-failure semantics.
async fn run_isolated(
    stage: Arc<dyn Stage>,
    mut ctx: StageContext,
) -> Result<(StageContext, Result<String, StageError>), tokio::task::JoinError> {
    tokio::spawn(async move {
        let outcome = stage.run(&mut ctx).await;
        (ctx, outcome)
    })
    .await
}

/// Cumulative progress after `completed` of `total` equally weighted stages
fn stage_progress(completed: usize, total: usize) -> u8 {
    debug_assert!(completed <= total && total > 0);
    let percent = (completed as f64 * 100.0 / total as f64).round() as u8;
    percent.min(100)
}
