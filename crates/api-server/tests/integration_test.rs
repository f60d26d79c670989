//! Integration tests for the API server
//!
//! These start the server on a local port, send real requests, and verify
//! responses. Pipeline stages that would shell out to external tools are
//! replaced with synthetic stages so the tests exercise the gateway and the
//! orchestration core end to end.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use video_text_api_server::{start_server, ApiState, ServerConfig};
use video_text_orchestrator::{Stage, StageContext, StageError, TaskOutput};

/// Synthetic stage that takes a moment and succeeds
struct SlowStage;

#[async_trait]
impl Stage for SlowStage {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn run(&self, _ctx: &mut StageContext) -> Result<String, StageError> {
        sleep(Duration::from_millis(50)).await;
        Ok("Slow stage done".to_string())
    }
}

/// Synthetic final stage that attaches an output
struct FinishStage;

#[async_trait]
impl Stage for FinishStage {
    fn name(&self) -> &'static str {
        "finish"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        ctx.artifacts.output = Some(TaskOutput::Dataset {
            dataset_file: format!("{}_dataset.jsonl", ctx.task_id),
            items_count: 0,
            video_title: None,
            video_duration_secs: None,
        });
        Ok("Finished".to_string())
    }
}

/// Start the server on the given port and return its shared state
async fn start_test_server(port: u16) -> ApiState {
    let config = ServerConfig {
        addr: format!("127.0.0.1:{port}"),
        ..ServerConfig::for_tests()
    };
    let state = ApiState::new(config);

    let server_state = state.clone();
    tokio::spawn(async move {
        let _ = start_server(server_state).await;
    });

    // Give the server time to bind
    sleep(Duration::from_millis(300)).await;
    state
}

#[tokio::test]
async fn test_health_endpoint() {
    let _state = start_test_server(18080).await;

    let response = reqwest::get("http://127.0.0.1:18080/api/health")
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let _state = start_test_server(18081).await;

    // Poll
    let response = reqwest::get("http://127.0.0.1:18081/api/status/no-such-task")
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Subscribe: immediate NotFound, no channel opened
    let response = reqwest::get("http://127.0.0.1:18081/api/events/no-such-task")
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Process
    let client = reqwest::Client::new();
    let response = client
        .post("http://127.0.0.1:18081/api/process/no-such-task")
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_dataset_submission_validation() {
    let _state = start_test_server(18082).await;
    let client = reqwest::Client::new();

    // Unusable source reference fails at submission, no task created
    let response = client
        .post("http://127.0.0.1:18082/api/dataset/create")
        .json(&serde_json::json!({ "youtube_url": "https://example.com/not-youtube" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Unknown model size is rejected the same way
    let response = client
        .post("http://127.0.0.1:18082/api/dataset/create")
        .json(&serde_json::json!({
            "youtube_url": "https://youtu.be/abc123",
            "model_size": "enormous"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_download_rejects_bad_names() {
    let _state = start_test_server(18083).await;

    let response = reqwest::get("http://127.0.0.1:18083/api/download/absent.srt")
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = reqwest::get("http://127.0.0.1:18083/api/download/..%2Fsecrets")
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    // Dataset download requires the .jsonl suffix
    let response = reqwest::get("http://127.0.0.1:18083/api/dataset/download/result.srt")
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_status_and_stream_follow_pipeline_to_terminal() {
    let state = start_test_server(18084).await;

    let task = state.store.create().await;

    // Attach a subscriber before the pipeline starts
    let events_url = format!("http://127.0.0.1:18084/api/events/{}", task.id);
    let subscriber = tokio::spawn(async move {
        reqwest::get(events_url).await.unwrap().text().await.unwrap()
    });
    sleep(Duration::from_millis(200)).await;

    let ctx = StageContext::new(&task.id, "/tmp/video-text-it-work", "/tmp/video-text-it-out");
    state
        .executor
        .spawn(ctx, vec![Arc::new(SlowStage), Arc::new(FinishStage)]);

    // The SSE body completes once the terminal snapshot closed the stream
    let body = subscriber.await.unwrap();
    assert!(body.contains("\"pending\""));
    assert!(body.contains("\"processing\""));
    assert!(body.contains("\"completed\""));
    assert!(body.contains("_dataset.jsonl"));

    // Poll agrees with the streamed terminal snapshot
    let response = reqwest::get(format!("http://127.0.0.1:18084/api/status/{}", task.id))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let snapshot: serde_json::Value = response.json().await.unwrap();
    assert_eq!(snapshot["status"], "completed");
    assert_eq!(snapshot["progress"], 100);
    assert_eq!(snapshot["result"]["kind"], "dataset");
}
