//! Transcription module
//!
//! Speech-to-text with two interchangeable backends: a local whisper.cpp CLI
//! run and the AssemblyAI REST API. Both produce a [`Transcript`] with timed
//! segments; the `subtitle` module turns segments into SRT or WebVTT files.

pub mod assemblyai;
pub mod stage;
pub mod subtitle;
pub mod whisper;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use video_text_common::MediaError;

pub use assemblyai::AssemblyAiClient;
pub use stage::{AssembleSubtitlesStage, TranscribeBackend, TranscribeStage, TranslateStage};
pub use whisper::transcribe_with_whisper;

/// Transcription errors
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    #[error("API key is required but not configured")]
    MissingApiKey,

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Failed to parse transcriber output: {0}")]
    OutputParseError(String),

    #[error("Processing error: {0}")]
    ProcessingError(#[from] MediaError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TranscriptionError>;

/// Whisper model size selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhisperModel {
    /// 39M parameters, fastest
    Tiny,
    /// 74M parameters
    Base,
    /// 244M parameters
    Small,
    /// 769M parameters
    Medium,
    /// 1.5B parameters, most accurate
    #[serde(rename = "large-v3")]
    LargeV3,
}

impl WhisperModel {
    /// Get the ggml model filename
    #[must_use]
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Tiny => "ggml-tiny.bin",
            Self::Base => "ggml-base.bin",
            Self::Small => "ggml-small.bin",
            Self::Medium => "ggml-medium.bin",
            Self::LargeV3 => "ggml-large-v3.bin",
        }
    }

    /// Parse a model size name as received from clients
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tiny" => Some(Self::Tiny),
            "base" => Some(Self::Base),
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" | "large-v2" | "large-v3" => Some(Self::LargeV3),
            _ => None,
        }
    }
}

/// Transcription configuration for the whisper.cpp backend
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// Model size to use
    pub model: WhisperModel,
    /// Directory holding ggml model files
    pub model_dir: PathBuf,
    /// Language code (e.g. "en", "ko") or None for auto-detection
    pub language: Option<String>,
    /// Translate to English instead of transcribing
    pub translate: bool,
    /// Beam search size (1-10, higher = more accurate but slower)
    pub beam_size: u8,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: WhisperModel::Base,
            model_dir: PathBuf::from("models"),
            language: None,
            translate: false,
            beam_size: 5,
        }
    }
}

impl TranscriptionConfig {
    #[must_use]
    pub fn new(model: WhisperModel, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            model_dir: model_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn translated(mut self) -> Self {
        self.translate = true;
        self
    }
}
