//! Frame text analysis module
//!
//! Samples frames from a video at a fixed interval with the FFmpeg CLI and
//! runs the tesseract CLI over each frame, producing timed text captures.

pub mod stage;

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use video_text_common::{MediaError, OcrCapture, Result};

pub use stage::AnalyzeFramesStage;

/// Frame OCR configuration
#[derive(Debug, Clone)]
pub struct FrameOcrConfig {
    /// Seconds between sampled frames
    pub interval_secs: f64,
    /// Tesseract language spec (e.g. "eng", "eng+kor")
    pub languages: String,
    /// Captures shorter than this many characters are discarded
    pub min_text_len: usize,
}

impl Default for FrameOcrConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5.0,
            languages: "eng".to_string(),
            min_text_len: 3,
        }
    }
}

/// Sample frames from a video into `frames_dir` at the configured interval
pub async fn sample_frames(
    video_path: &Path,
    frames_dir: &Path,
    interval_secs: f64,
) -> Result<Vec<PathBuf>> {
    if interval_secs <= 0.0 {
        return Err(MediaError::InvalidInput(
            "Frame interval must be positive".to_string(),
        ));
    }

    tokio::fs::create_dir_all(frames_dir).await?;
    let pattern = frames_dir.join("frame_%05d.png");

    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(video_path)
        .arg("-vf")
        .arg(format!("fps=1/{interval_secs}"))
        .arg("-y")
        .arg(&pattern)
        .output()
        .await
        .map_err(|e| MediaError::from_spawn_error("ffmpeg", e))?;

    if !output.status.success() {
        return Err(MediaError::from_tool_output("ffmpeg", &output));
    }

    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(frames_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("frame_") && name.ends_with(".png") {
            frames.push(entry.path());
        }
    }
    frames.sort();
    debug!("Sampled {} frames from {}", frames.len(), video_path.display());
    Ok(frames)
}

/// Recognize text in one frame image with tesseract
pub async fn recognize_frame(image_path: &Path, languages: &str) -> Result<String> {
    let output = Command::new("tesseract")
        .arg(image_path)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .output()
        .await
        .map_err(|e| MediaError::from_spawn_error("tesseract", e))?;

    if !output.status.success() {
        return Err(MediaError::from_tool_output("tesseract", &output));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Sample a video's frames and OCR each of them
///
/// Capture timestamps are derived from the frame index and interval. Frames
/// yielding no usable text are skipped.
pub async fn analyze_video(
    video_path: &Path,
    work_dir: &Path,
    config: &FrameOcrConfig,
) -> Result<Vec<OcrCapture>> {
    let frames_dir = work_dir.join("frames");
    let frames = sample_frames(video_path, &frames_dir, config.interval_secs).await?;

    let mut captures = Vec::new();
    for (index, frame) in frames.iter().enumerate() {
        let raw = recognize_frame(frame, &config.languages).await?;
        let text = clean_text(&raw, config.min_text_len);
        if !text.is_empty() {
            captures.push(OcrCapture {
                timestamp_secs: index as f64 * config.interval_secs,
                text,
            });
        }
    }

    info!(
        "OCR produced {} captures from {} frames",
        captures.len(),
        frames.len()
    );
    Ok(captures)
}

/// Drop noise lines and collapse whitespace in raw OCR output
fn clean_text(raw: &str, min_text_len: usize) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| line.chars().filter(|c| c.is_alphanumeric()).count() >= min_text_len)
        .collect::<Vec<_>>()
        .join(" ")
}
