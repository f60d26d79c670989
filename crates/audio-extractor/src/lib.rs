//! Audio extraction module
//!
//! Extracts the audio track from video/audio files via the FFmpeg CLI with
//! configurable format, sample rate, channels, and optional EBU R128
//! normalization.

pub mod stage;

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use video_text_common::{MediaError, Result};

pub use stage::ExtractAudioStage;

/// Audio output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// PCM (uncompressed) - for speech models
    PCM,
    /// FLAC (lossless compression)
    FLAC,
    /// MP3 (lossy compression) - for compatibility
    MP3,
}

impl AudioFormat {
    /// Get file extension for this format
    #[must_use]
    pub fn extension(&self) -> &str {
        match self {
            AudioFormat::PCM => "wav",
            AudioFormat::FLAC => "flac",
            AudioFormat::MP3 => "mp3",
        }
    }

    /// Get FFmpeg codec name for this format
    fn codec_name(&self) -> &str {
        match self {
            AudioFormat::PCM => "pcm_s16le",
            AudioFormat::FLAC => "flac",
            AudioFormat::MP3 => "libmp3lame",
        }
    }
}

/// Audio extraction configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Target sample rate (16000 for speech models)
    pub sample_rate: u32,
    /// Number of channels (1 for mono, 2 for stereo)
    pub channels: u8,
    /// Output audio format
    pub format: AudioFormat,
    /// Apply EBU R128 normalization to -23 LUFS
    pub normalize: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            format: AudioFormat::PCM,
            normalize: false,
        }
    }
}

impl AudioConfig {
    /// Config for speech-to-text input (16kHz mono PCM)
    #[must_use]
    pub fn for_speech() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            format: AudioFormat::PCM,
            normalize: false,
        }
    }
}

/// Extract audio from a video/audio file
///
/// The output path's extension is replaced to match the configured format.
///
/// # Errors
/// Returns an error if the input is missing, FFmpeg is unavailable, or the
/// extraction fails (e.g. no audio stream).
pub async fn extract_audio(
    input_path: &Path,
    output_path: &Path,
    config: &AudioConfig,
) -> Result<PathBuf> {
    if !input_path.exists() {
        return Err(MediaError::InvalidInput(format!(
            "Input file does not exist: {}",
            input_path.display()
        )));
    }

    let output_path = output_path.with_extension(config.format.extension());
    debug!(
        "Extracting audio: {} -> {}",
        input_path.display(),
        output_path.display()
    );

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-i")
        .arg(input_path)
        .arg("-vn") // No video
        .arg("-acodec")
        .arg(config.format.codec_name())
        .arg("-ar")
        .arg(config.sample_rate.to_string())
        .arg("-ac")
        .arg(config.channels.to_string());

    if config.format == AudioFormat::MP3 {
        cmd.arg("-b:a").arg("128k");
    }

    if config.normalize {
        cmd.arg("-af").arg("loudnorm=I=-23:LRA=7:TP=-2");
    }

    let output = cmd
        .arg("-y") // Overwrite output
        .arg(&output_path)
        .output()
        .await
        .map_err(|e| MediaError::from_spawn_error("ffmpeg", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("does not contain any stream")
            || stderr.contains("Output file does not contain any stream")
        {
            return Err(MediaError::NoAudioStream);
        }
        return Err(MediaError::from_tool_output("ffmpeg", &output));
    }

    info!("Extracted audio to {}", output_path.display());
    Ok(output_path)
}
