//! Local transcription through the whisper.cpp CLI
//!
//! Runs `whisper-cli` with JSON output (`-oj`) and parses the result into a
//! [`Transcript`]. Requires a ggml model file under the configured model
//! directory.

use std::path::Path;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use video_text_common::{MediaError, Transcript, TranscriptSegment};

use crate::{Result, TranscriptionConfig, TranscriptionError};

/// JSON shape written by `whisper-cli -oj`
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    result: Option<WhisperResult>,
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperResult {
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    offsets: WhisperOffsets,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    /// Segment start in milliseconds
    from: u64,
    /// Segment end in milliseconds
    to: u64,
}

/// Transcribe an audio file with whisper.cpp
///
/// # Errors
/// Returns an error if the model file is missing, the CLI is unavailable or
/// fails, or its JSON output cannot be parsed.
pub async fn transcribe_with_whisper(
    audio_path: &Path,
    config: &TranscriptionConfig,
) -> Result<Transcript> {
    let model_path = config.model_dir.join(config.model.filename());
    if !model_path.exists() {
        return Err(TranscriptionError::ModelNotFound(
            model_path.display().to_string(),
        ));
    }

    // whisper-cli writes <output_base>.json with -oj
    let output_base = audio_path.with_extension("transcript");
    info!(
        "Transcribing {} with model {}",
        audio_path.display(),
        config.model.filename()
    );

    let mut cmd = Command::new("whisper-cli");
    cmd.arg("-m")
        .arg(&model_path)
        .arg("-f")
        .arg(audio_path)
        .arg("-oj")
        .arg("-of")
        .arg(&output_base)
        .arg("-bs")
        .arg(config.beam_size.to_string());

    if let Some(language) = &config.language {
        cmd.arg("-l").arg(language);
    }
    if config.translate {
        cmd.arg("-tr");
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| MediaError::from_spawn_error("whisper-cli", e))?;

    if !output.status.success() {
        return Err(TranscriptionError::TranscriptionFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    // whisper-cli appends .json to the -of base
    let json_path = std::path::PathBuf::from(format!("{}.json", output_base.to_string_lossy()));
    let contents = tokio::fs::read_to_string(&json_path).await?;
    let parsed: WhisperOutput = serde_json::from_str(&contents)
        .map_err(|e| TranscriptionError::OutputParseError(e.to_string()))?;

    // Intermediate JSON is no longer needed
    let _ = tokio::fs::remove_file(&json_path).await;

    let transcript = build_transcript(parsed, config.language.as_deref());
    debug!(
        "Transcription produced {} segments (language: {:?})",
        transcript.segments.len(),
        transcript.language
    );
    Ok(transcript)
}

fn build_transcript(output: WhisperOutput, requested_language: Option<&str>) -> Transcript {
    let language = output
        .result
        .and_then(|r| r.language)
        .or_else(|| requested_language.map(str::to_string));

    let segments: Vec<TranscriptSegment> = output
        .transcription
        .iter()
        .map(|segment| TranscriptSegment {
            start_secs: segment.offsets.from as f64 / 1000.0,
            end_secs: segment.offsets.to as f64 / 1000.0,
            text: segment.text.trim().to_string(),
        })
        .filter(|segment| !segment.text.is_empty())
        .collect();

    let text = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Transcript {
        text,
        language,
        segments,
    }
}
