//! End-to-end pipeline behavior with synthetic stages

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;

use video_text_orchestrator::{
    PipelineExecutor, ProgressHub, Stage, StageContext, StageError, Task, TaskOutput, TaskStatus,
    TaskStore,
};

/// Synthetic stage that records its execution and optionally fails or panics
struct TestStage {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail_with: Option<String>,
    panic: bool,
    /// Output to attach when this is the assembling stage
    output: Option<TaskOutput>,
}

impl TestStage {
    fn ok(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Stage> {
        Arc::new(Self {
            name,
            log: log.clone(),
            fail_with: None,
            panic: false,
            output: None,
        })
    }

    fn failing(
        name: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
        detail: &str,
    ) -> Arc<dyn Stage> {
        Arc::new(Self {
            name,
            log: log.clone(),
            fail_with: Some(detail.to_string()),
            panic: false,
            output: None,
        })
    }

    fn panicking(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Stage> {
        Arc::new(Self {
            name,
            log: log.clone(),
            fail_with: None,
            panic: true,
            output: None,
        })
    }

    fn assembling(
        name: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
        output: TaskOutput,
    ) -> Arc<dyn Stage> {
        Arc::new(Self {
            name,
            log: log.clone(),
            fail_with: None,
            panic: false,
            output: Some(output),
        })
    }
}

#[async_trait]
impl Stage for TestStage {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        self.log.lock().await.push(self.name.to_string());
        if self.panic {
            panic!("synthetic stage panic");
        }
        if let Some(detail) = &self.fail_with {
            return Err(StageError::external(detail.clone()));
        }
        if let Some(output) = &self.output {
            ctx.artifacts.output = Some(output.clone());
        }
        Ok(format!("{} done", self.name))
    }
}

fn dataset_output(tag: &str) -> TaskOutput {
    TaskOutput::Dataset {
        dataset_file: format!("{tag}.jsonl"),
        items_count: 1,
        video_title: Some(tag.to_string()),
        video_duration_secs: None,
    }
}

struct Harness {
    store: TaskStore,
    hub: ProgressHub,
    executor: PipelineExecutor,
}

impl Harness {
    fn new() -> Self {
        let store = TaskStore::new();
        let hub = ProgressHub::new();
        let executor = PipelineExecutor::new(store.clone(), hub.clone());
        Self {
            store,
            hub,
            executor,
        }
    }
}

/// Collect every snapshot a subscriber receives until the channel closes
async fn collect_snapshots(
    mut rx: tokio::sync::broadcast::Receiver<Task>,
) -> Vec<Task> {
    let mut snapshots = Vec::new();
    loop {
        match rx.recv().await {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(_)) => continue,
        }
    }
    snapshots
}

#[tokio::test]
async fn test_three_stage_success() {
    let harness = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let task = harness.store.create().await;
    let rx = harness.hub.subscribe(&task.id).await;

    let stages = vec![
        TestStage::ok("a", &log),
        TestStage::ok("b", &log),
        TestStage::assembling("c", &log, dataset_output("c")),
    ];
    harness
        .executor
        .run(StageContext::new(&task.id, "/tmp/w", "/tmp/o"), stages)
        .await;

    let snapshots = collect_snapshots(rx).await;
    assert_eq!(*log.lock().await, vec!["a", "b", "c"]);

    // starting, after a, after b, completed
    let progress: Vec<u8> = snapshots.iter().map(|s| s.progress).collect();
    assert_eq!(progress, vec![0, 33, 67, 100]);

    let last = snapshots.last().unwrap();
    assert_eq!(last.status, TaskStatus::Completed);
    assert_eq!(last.result, Some(dataset_output("c")));
    assert!(last.error.is_none());

    let stored = harness.store.get(&task.id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert_eq!(stored.progress, 100);
}

#[tokio::test]
async fn test_failing_stage_stops_pipeline() {
    let harness = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let task = harness.store.create().await;
    let rx = harness.hub.subscribe(&task.id).await;

    let stages = vec![
        TestStage::ok("a", &log),
        TestStage::failing("b", &log, "boom"),
        TestStage::ok("c", &log),
    ];
    harness
        .executor
        .run(StageContext::new(&task.id, "/tmp/w", "/tmp/o"), stages)
        .await;

    // Stage c never ran
    assert_eq!(*log.lock().await, vec!["a", "b"]);

    let snapshots = collect_snapshots(rx).await;
    let last = snapshots.last().unwrap();
    assert_eq!(last.status, TaskStatus::Failed);
    assert_eq!(last.error.as_deref(), Some("boom"));
    // Progress stays at the floor of the last successful stage
    assert_eq!(last.progress, 33);
    assert!(last.result.is_none());
}

#[tokio::test]
async fn test_panicking_stage_fails_task() {
    let harness = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let task = harness.store.create().await;

    let stages = vec![
        TestStage::ok("a", &log),
        TestStage::panicking("b", &log),
        TestStage::ok("c", &log),
    ];
    harness
        .executor
        .run(StageContext::new(&task.id, "/tmp/w", "/tmp/o"), stages)
        .await;

    assert_eq!(*log.lock().await, vec!["a", "b"]);

    let stored = harness.store.get(&task.id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    assert!(stored.error.is_some());
}

#[tokio::test]
async fn test_pipeline_without_output_fails() {
    let harness = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let task = harness.store.create().await;

    // Final stage never sets an output
    let stages = vec![TestStage::ok("a", &log), TestStage::ok("b", &log)];
    harness
        .executor
        .run(StageContext::new(&task.id, "/tmp/w", "/tmp/o"), stages)
        .await;

    let stored = harness.store.get(&task.id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
}

#[tokio::test]
async fn test_progress_is_monotone_and_statuses_follow_state_machine() {
    let harness = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let task = harness.store.create().await;
    let rx = harness.hub.subscribe(&task.id).await;

    let stages = vec![
        TestStage::ok("a", &log),
        TestStage::ok("b", &log),
        TestStage::ok("c", &log),
        TestStage::assembling("d", &log, dataset_output("d")),
    ];
    harness
        .executor
        .run(StageContext::new(&task.id, "/tmp/w", "/tmp/o"), stages)
        .await;

    let snapshots = collect_snapshots(rx).await;
    let mut previous = 0u8;
    for snapshot in &snapshots {
        assert!(snapshot.progress >= previous);
        previous = snapshot.progress;
        // progress hits 100 only on the completed snapshot
        assert_eq!(snapshot.progress == 100, snapshot.status == TaskStatus::Completed);
        // result and error never coexist
        assert!(snapshot.result.is_none() || snapshot.error.is_none());
    }
    assert_eq!(snapshots.last().unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_concurrent_pipelines_stay_isolated() {
    let harness = Harness::new();
    let mut task_ids = Vec::new();
    let mut receivers = Vec::new();

    for i in 0..8 {
        let log = Arc::new(Mutex::new(Vec::new()));
        let task = harness.store.create().await;
        receivers.push(harness.hub.subscribe(&task.id).await);

        let tag = format!("job-{i}");
        let stages = vec![
            TestStage::ok("a", &log),
            TestStage::assembling("b", &log, dataset_output(&tag)),
        ];
        harness
            .executor
            .spawn(StageContext::new(&task.id, "/tmp/w", "/tmp/o"), stages);
        task_ids.push((task.id.clone(), tag));
    }

    for ((task_id, tag), rx) in task_ids.iter().zip(receivers) {
        let snapshots = collect_snapshots(rx).await;
        let last = snapshots.last().unwrap();
        assert_eq!(&last.id, task_id);
        assert_eq!(last.status, TaskStatus::Completed);
        // Each task carries only its own result
        assert_eq!(last.result, Some(dataset_output(tag)));
    }
}

#[tokio::test]
async fn test_subscriber_sees_terminal_snapshot_then_close() {
    let harness = Harness::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let task = harness.store.create().await;
    let rx = harness.hub.subscribe(&task.id).await;

    let stages = vec![TestStage::assembling("only", &log, dataset_output("x"))];
    harness
        .executor
        .spawn(StageContext::new(&task.id, "/tmp/w", "/tmp/o"), stages);

    let snapshots = collect_snapshots(rx).await;
    assert!(!snapshots.is_empty());
    assert!(snapshots.last().unwrap().status.is_terminal());
}

#[tokio::test]
async fn test_empty_pipeline_fails() {
    let harness = Harness::new();
    let task = harness.store.create().await;

    harness
        .executor
        .run(StageContext::new(&task.id, "/tmp/w", "/tmp/o"), Vec::new())
        .await;

    let stored = harness.store.get(&task.id).await.unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
}
