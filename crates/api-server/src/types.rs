//! API request and response types

use serde::{Deserialize, Serialize};

/// Options for subtitle generation over an uploaded video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Whisper model size ("tiny" ... "large-v3")
    #[serde(default = "default_model_size")]
    pub model_size: String,
    /// Language code, or None for auto-detection
    #[serde(default)]
    pub language: Option<String>,
    /// Subtitle output format ("srt" or "vtt")
    #[serde(default = "default_subtitle_format")]
    pub subtitle_format: String,
    /// Also produce an English translation
    #[serde(default)]
    pub translate_english: bool,
    /// Transcribe through AssemblyAI instead of the local model
    #[serde(default = "default_use_assemblyai")]
    pub use_assemblyai: bool,
    /// AssemblyAI API key override (falls back to server configuration)
    #[serde(default)]
    pub assemblyai_api_key: Option<String>,
}

fn default_model_size() -> String {
    "base".to_string()
}

fn default_subtitle_format() -> String {
    "srt".to_string()
}

fn default_use_assemblyai() -> bool {
    true
}

impl Default for ProcessRequest {
    fn default() -> Self {
        Self {
            model_size: default_model_size(),
            language: None,
            subtitle_format: default_subtitle_format(),
            translate_english: false,
            use_assemblyai: default_use_assemblyai(),
            assemblyai_api_key: None,
        }
    }
}

/// Dataset creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRequest {
    pub youtube_url: String,
    /// YouTube Data API key override (falls back to server configuration)
    #[serde(default)]
    pub youtube_api_key: Option<String>,
    /// Also OCR sampled frames
    #[serde(default)]
    pub use_ocr: bool,
    #[serde(default = "default_dataset_model_size")]
    pub model_size: String,
}

fn default_dataset_model_size() -> String {
    "large-v3".to_string()
}

/// Upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub task_id: String,
    pub filename: String,
    pub size: usize,
}

/// Response for accepted long-running work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub task_id: String,
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
