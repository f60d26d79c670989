/// Common types and utilities shared across the video-text pipeline crates.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the media capability crates
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{tool} not found on PATH")]
    ToolMissing { tool: String },

    #[error("{tool} failed with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("No audio stream found")]
    NoAudioStream,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl MediaError {
    /// Build a `ToolFailed`/`ToolMissing` error from a finished process.
    #[must_use]
    pub fn from_tool_output(tool: &str, output: &std::process::Output) -> Self {
        MediaError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Map a spawn error to `ToolMissing` when the binary is absent.
    #[must_use]
    pub fn from_spawn_error(tool: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            MediaError::ToolMissing {
                tool: tool.to_string(),
            }
        } else {
            MediaError::IoError(err)
        }
    }
}

/// Result type for media capability operations
pub type Result<T> = std::result::Result<T, MediaError>;

/// Subtitle output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    /// Get file extension for this format
    #[must_use]
    pub fn extension(&self) -> &str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
        }
    }

    /// Parse a format name as received from clients ("srt", "vtt")
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "srt" => Some(SubtitleFormat::Srt),
            "vtt" => Some(SubtitleFormat::Vtt),
            _ => None,
        }
    }
}

/// One timed segment of transcribed speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Complete transcription result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Full transcript text
    pub text: String,
    /// Detected or requested language code (e.g. "en", "ko")
    pub language: Option<String>,
    /// Timed segments, in order
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Leading excerpt of the transcript text, capped at `max_chars`.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

/// Metadata describing a source video
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub channel_id: Option<String>,
    pub description: Option<String>,
    pub duration_secs: Option<f64>,
    pub views: Option<u64>,
    pub publish_date: Option<String>,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub url: Option<String>,
}

/// A single viewer comment on a source video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: Option<String>,
    pub text: String,
    pub likes: u64,
    pub published_at: Option<String>,
}

/// Text captured from a sampled video frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrCapture {
    pub timestamp_secs: f64,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_format_extension() {
        assert_eq!(SubtitleFormat::Srt.extension(), "srt");
        assert_eq!(SubtitleFormat::Vtt.extension(), "vtt");
    }

    #[test]
    fn test_subtitle_format_parse() {
        assert_eq!(SubtitleFormat::parse("srt"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::parse("VTT"), Some(SubtitleFormat::Vtt));
        assert_eq!(SubtitleFormat::parse("ass"), None);
    }

    #[test]
    fn test_transcript_excerpt() {
        let transcript = Transcript {
            text: "hello world".to_string(),
            language: Some("en".to_string()),
            segments: vec![],
        };
        assert_eq!(transcript.excerpt(5), "hello");
        assert_eq!(transcript.excerpt(500), "hello world");
    }

    #[test]
    fn test_transcript_excerpt_multibyte() {
        let transcript = Transcript {
            text: "안녕하세요".to_string(),
            language: Some("ko".to_string()),
            segments: vec![],
        };
        assert_eq!(transcript.excerpt(2), "안녕");
    }

    #[test]
    fn test_media_error_from_spawn_error() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        match MediaError::from_spawn_error("ffmpeg", err) {
            MediaError::ToolMissing { tool } => assert_eq!(tool, "ffmpeg"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
