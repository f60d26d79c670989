//! REST API server for video-to-text processing
//!
//! The gateway in front of the orchestration core: accepts uploads and
//! dataset requests, schedules pipeline runs, and exposes poll, SSE
//! subscribe, and artifact download endpoints.

mod handlers;
mod pipeline;
mod stream;
mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use video_text_orchestrator::{PipelineExecutor, ProgressHub, TaskStore};

pub use handlers::*;
pub use pipeline::{dataset_stages, subtitle_stages, SubtitleOptions};
pub use types::*;

/// Largest accepted upload (2 GiB)
const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;

/// Server configuration, read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub addr: String,
    /// Where uploads are stored until processed
    pub upload_dir: PathBuf,
    /// Where final artifacts are written
    pub output_dir: PathBuf,
    /// Scratch space for pipeline runs
    pub work_dir: PathBuf,
    /// Directory holding ggml whisper models
    pub model_dir: PathBuf,
    /// How long terminal tasks stay queryable
    pub retention: Duration,
    pub assemblyai_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
}

impl ServerConfig {
    /// Read configuration from environment variables, with defaults matching
    /// a local development setup.
    #[must_use]
    pub fn from_env() -> Self {
        let retention_secs = std::env::var("TASK_RETENTION_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        Self {
            addr: std::env::var("API_SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            upload_dir: env_path("UPLOAD_DIR", "uploads"),
            output_dir: env_path("OUTPUT_DIR", "outputs"),
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("video-text-work")),
            model_dir: env_path("WHISPER_MODEL_DIR", "models"),
            retention: Duration::from_secs(retention_secs),
            assemblyai_api_key: std::env::var("ASSEMBLYAI_API_KEY").ok(),
            youtube_api_key: std::env::var("YOUTUBE_API_KEY").ok(),
        }
    }

    /// Configuration pointing at throwaway directories, for tests
    #[must_use]
    pub fn for_tests() -> Self {
        let base = std::env::temp_dir().join("video-text-tests");
        Self {
            addr: "127.0.0.1:0".to_string(),
            upload_dir: base.join("uploads"),
            output_dir: base.join("outputs"),
            work_dir: base.join("work"),
            model_dir: base.join("models"),
            retention: Duration::from_secs(3600),
            assemblyai_api_key: None,
            youtube_api_key: None,
        }
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

/// API server state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    pub store: TaskStore,
    pub hub: ProgressHub,
    pub executor: PipelineExecutor,
    pub config: Arc<ServerConfig>,
}

impl ApiState {
    /// Create new API state around a fresh store and hub
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let store = TaskStore::new();
        let hub = ProgressHub::new();
        let executor = PipelineExecutor::new(store.clone(), hub.clone());
        Self {
            store,
            hub,
            executor,
            config: Arc::new(config),
        }
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/upload", post(upload_video))
        .route("/api/process/{task_id}", post(process_video))
        .route("/api/dataset/create", post(create_dataset))
        .route("/api/status/{task_id}", get(get_status))
        .route("/api/events/{task_id}", get(stream::task_events))
        .route("/api/download/{filename}", get(download_file))
        .route("/api/dataset/download/{filename}", get(download_dataset))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server and the background retention sweeper
pub async fn start_server(state: ApiState) -> Result<(), std::io::Error> {
    let config = state.config.clone();
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::create_dir_all(&config.output_dir).await?;
    tokio::fs::create_dir_all(&config.work_dir).await?;

    // Hourly sweep of expired terminal tasks and abandoned channels
    let store = state.store.clone();
    let hub = state.hub.clone();
    let retention = config.retention;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let removed = store.remove_expired(retention).await;
            if removed > 0 {
                tracing::info!("Removed {} expired tasks", removed);
            }
            hub.cleanup().await;
        }
    });

    tracing::info!("Starting API server on {}", config.addr);
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_state_creation() {
        let state = ApiState::new(ServerConfig::for_tests());
        assert!(state.store.is_empty().await);
    }

    #[test]
    fn test_config_for_tests_has_no_keys() {
        let config = ServerConfig::for_tests();
        assert!(config.assemblyai_api_key.is_none());
        assert!(config.youtube_api_key.is_none());
    }
}
