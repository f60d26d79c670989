//! HTTP request handlers for API endpoints

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tracing::{error, info};

use video_text_orchestrator::{StageContext, StoreError, TaskStatus};
use video_text_transcription::WhisperModel;
use video_text_youtube::extract_video_id;

use crate::pipeline::{dataset_stages, subtitle_stages, SubtitleOptions};
use crate::types::{AcceptedResponse, DatasetRequest, HealthResponse, ProcessRequest, UploadResponse};
use crate::ApiState;

/// Video container extensions accepted for upload
const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "flv", "wmv"];

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Accept a video upload and create its task
///
/// The file lands in the upload directory as `{task_id}_{filename}`; the
/// task stays pending until processing is requested.
pub async fn upload_video(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(sanitize_filename)
            .ok_or((StatusCode::BAD_REQUEST, "Missing file name".to_string()))?;
        if !has_allowed_extension(&filename) {
            return Err((StatusCode::BAD_REQUEST, "Invalid video format".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read upload: {e}")))?;

        let task = state.store.create().await;
        let dest = state
            .config
            .upload_dir
            .join(format!("{}_{}", task.id, filename));
        tokio::fs::write(&dest, &data).await.map_err(|e| {
            error!("Failed to store upload {}: {}", dest.display(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store upload".to_string(),
            )
        })?;

        info!(
            "Upload accepted: task_id={}, file={}, {} bytes",
            task.id,
            filename,
            data.len()
        );
        return Ok(Json(UploadResponse {
            task_id: task.id,
            filename,
            size: data.len(),
        }));
    }

    Err((StatusCode::BAD_REQUEST, "Missing file field".to_string()))
}

/// Start subtitle processing for a previously uploaded video
pub async fn process_video(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
    Json(request): Json<ProcessRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let snapshot = state.store.get(&task_id).await.map_err(store_error)?;
    if snapshot.status != TaskStatus::Pending {
        return Err((StatusCode::CONFLICT, "Task already started".to_string()));
    }

    let video_path = find_uploaded_file(&state.config.upload_dir, &task_id)
        .await
        .ok_or((StatusCode::NOT_FOUND, "Video file not found".to_string()))?;

    let options = SubtitleOptions::from_request(&request, &state.config)
        .map_err(|detail| (StatusCode::BAD_REQUEST, detail))?;
    let stages = subtitle_stages(&options, &state.config);

    let work_dir = state.config.work_dir.join(&task_id);
    tokio::fs::create_dir_all(&work_dir).await.map_err(|e| {
        error!("Failed to create work dir {}: {}", work_dir.display(), e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to prepare working directory".to_string(),
        )
    })?;

    let mut ctx = StageContext::new(&task_id, &work_dir, &state.config.output_dir);
    ctx.artifacts.video_path = Some(video_path);
    state.executor.spawn(ctx, stages);

    info!("Processing started for task {}", task_id);
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            task_id,
            message: "Processing started".to_string(),
        }),
    ))
}

/// Create a dataset from a YouTube URL
pub async fn create_dataset(
    State(state): State<ApiState>,
    Json(request): Json<DatasetRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Unusable source references fail here, before any task exists
    if extract_video_id(&request.youtube_url).is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Not a recognizable YouTube URL: {}", request.youtube_url),
        ));
    }
    let model = WhisperModel::parse(&request.model_size).ok_or((
        StatusCode::BAD_REQUEST,
        format!("Unknown model size: {}", request.model_size),
    ))?;

    let task = state.store.create().await;
    let work_dir = state.config.work_dir.join(&task.id);
    tokio::fs::create_dir_all(&work_dir).await.map_err(|e| {
        error!("Failed to create work dir {}: {}", work_dir.display(), e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to prepare working directory".to_string(),
        )
    })?;

    let youtube_api_key = request
        .youtube_api_key
        .clone()
        .or_else(|| state.config.youtube_api_key.clone());
    let stages = dataset_stages(
        &request.youtube_url,
        youtube_api_key,
        request.use_ocr,
        model,
        &state.config,
    );

    let ctx = StageContext::new(&task.id, &work_dir, &state.config.output_dir);
    state.executor.spawn(ctx, stages);

    info!("Dataset creation started for task {}", task.id);
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            task_id: task.id,
            message: "Dataset creation started".to_string(),
        }),
    ))
}

/// Current task snapshot
pub async fn get_status(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let snapshot = state.store.get(&task_id).await.map_err(store_error)?;
    Ok(Json(snapshot))
}

/// Download a produced artifact by name
pub async fn download_file(
    State(state): State<ApiState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    serve_output_file(&state, &filename).await
}

/// Download a produced dataset by name (requires the `.jsonl` suffix)
pub async fn download_dataset(
    State(state): State<ApiState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !filename.ends_with(".jsonl") {
        return Err((
            StatusCode::NOT_FOUND,
            "Dataset file not found".to_string(),
        ));
    }
    serve_output_file(&state, &filename).await
}

async fn serve_output_file(
    state: &ApiState,
    filename: &str,
) -> Result<([(header::HeaderName, String); 2], Vec<u8>), (StatusCode, String)> {
    // Artifact names never contain path separators
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err((StatusCode::BAD_REQUEST, "Invalid file name".to_string()));
    }

    let path = state.config.output_dir.join(filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, format!("File not found: {filename}")))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}

/// Strip any path components a client sends in a file name
fn sanitize_filename(name: &str) -> String {
    FsPath::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string())
}

fn has_allowed_extension(filename: &str) -> bool {
    FsPath::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Locate the uploaded file for a task (`{task_id}_{filename}`)
async fn find_uploaded_file(upload_dir: &FsPath, task_id: &str) -> Option<PathBuf> {
    let prefix = format!("{task_id}_");
    let mut entries = tokio::fs::read_dir(upload_dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            return Some(entry.path());
        }
    }
    None
}

fn store_error(err: StoreError) -> (StatusCode, String) {
    match err {
        StoreError::NotFound(id) => (StatusCode::NOT_FOUND, format!("Task not found: {id}")),
        other => {
            error!("Unexpected store error: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("video.mp4"), "video.mp4");
        assert_eq!(sanitize_filename("/etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("a/b/c.mkv"), "c.mkv");
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(has_allowed_extension("movie.mp4"));
        assert!(has_allowed_extension("MOVIE.MKV"));
        assert!(!has_allowed_extension("notes.txt"));
        assert!(!has_allowed_extension("no_extension"));
    }

    #[tokio::test]
    async fn test_find_uploaded_file() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("t1_video.mp4"), b"x")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("t2_other.mp4"), b"x")
            .await
            .unwrap();

        let found = find_uploaded_file(dir.path(), "t1").await.unwrap();
        assert!(found.ends_with("t1_video.mp4"));
        assert!(find_uploaded_file(dir.path(), "t3").await.is_none());
    }
}
