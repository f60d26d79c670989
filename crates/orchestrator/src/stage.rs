//! Stage capability interface
//!
//! A stage wraps exactly one external operation (download, extract audio,
//! transcribe, ...). Stages are pure request/response against the pipeline
//! context: they never read or write task state or notify subscribers — all
//! status flows back through the executor.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use video_text_common::{Comment, MediaError, OcrCapture, Transcript, VideoMetadata};

use crate::task::TaskOutput;

/// Classification of a stage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageErrorKind {
    /// Required capability (tool, model, credential) is not available
    Unavailable,
    /// The stage was handed input it cannot work with
    InvalidInput,
    /// An external system (tool run, remote API) reported an error
    External,
    /// Unexpected fault inside the stage itself
    Internal,
}

/// Failure of a single stage invocation
#[derive(Debug, Error)]
#[error("{detail}")]
pub struct StageError {
    pub kind: StageErrorKind,
    pub detail: String,
}

impl StageError {
    #[must_use]
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            kind: StageErrorKind::Unavailable,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self {
            kind: StageErrorKind::InvalidInput,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn external(detail: impl Into<String>) -> Self {
        Self {
            kind: StageErrorKind::External,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            kind: StageErrorKind::Internal,
            detail: detail.into(),
        }
    }
}

impl From<MediaError> for StageError {
    fn from(err: MediaError) -> Self {
        let kind = match &err {
            MediaError::ToolMissing { .. } => StageErrorKind::Unavailable,
            MediaError::UnsupportedFormat(_) | MediaError::InvalidInput(_) => {
                StageErrorKind::InvalidInput
            }
            _ => StageErrorKind::External,
        };
        Self {
            kind,
            detail: err.to_string(),
        }
    }
}

/// Intermediate outputs accumulated across one pipeline run
#[derive(Debug, Default)]
pub struct Artifacts {
    /// Source video on disk (uploaded or downloaded)
    pub video_path: Option<PathBuf>,
    /// Extracted audio track
    pub audio_path: Option<PathBuf>,
    /// Transcription of the audio track
    pub transcript: Option<Transcript>,
    /// English translation, when a translate stage ran
    pub english_transcript: Option<Transcript>,
    /// Source video metadata
    pub metadata: Option<VideoMetadata>,
    /// Viewer comments on the source video
    pub comments: Vec<Comment>,
    /// Text captured from sampled frames
    pub ocr_captures: Vec<OcrCapture>,
    /// Final artifact references; set by the assembling stage and taken by
    /// the executor on completion
    pub output: Option<TaskOutput>,
}

/// Per-run state handed from stage to stage.
///
/// Owned exclusively by the executor run processing one task and discarded
/// when the run reaches a terminal state.
#[derive(Debug)]
pub struct StageContext {
    /// Identifier of the task this run belongs to
    pub task_id: String,
    /// Scratch directory for intermediate files
    pub work_dir: PathBuf,
    /// Directory where final artifacts are written
    pub output_dir: PathBuf,
    pub artifacts: Artifacts,
}

impl StageContext {
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        work_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            work_dir: work_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            artifacts: Artifacts::default(),
        }
    }
}

/// One external capability invocation within a pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short machine name, used in logs
    fn name(&self) -> &'static str;

    /// Execute against the accumulated context. The returned string is the
    /// human-readable description of what just completed, shown to observers
    /// as the task message.
    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_kind_mapping() {
        let err: StageError = MediaError::ToolMissing {
            tool: "ffmpeg".to_string(),
        }
        .into();
        assert_eq!(err.kind, StageErrorKind::Unavailable);

        let err: StageError = MediaError::InvalidInput("bad url".to_string()).into();
        assert_eq!(err.kind, StageErrorKind::InvalidInput);

        let err: StageError = MediaError::Http("503".to_string()).into();
        assert_eq!(err.kind, StageErrorKind::External);
    }

    #[test]
    fn test_context_starts_empty() {
        let ctx = StageContext::new("t1", "/tmp/work", "/tmp/out");
        assert!(ctx.artifacts.video_path.is_none());
        assert!(ctx.artifacts.output.is_none());
        assert!(ctx.artifacts.comments.is_empty());
    }
}
