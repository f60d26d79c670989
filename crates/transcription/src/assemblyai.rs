//! Transcription through the AssemblyAI REST API
//!
//! Uploads the audio file, creates a transcript job, and polls until it
//! settles. Word timings are regrouped into ~3 second segments so subtitle
//! composition works the same as with the local backend.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use video_text_common::{Transcript, TranscriptSegment};

use crate::{Result, TranscriptionError};

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com/v2";

/// Target duration of a regrouped subtitle segment
const SEGMENT_DURATION_SECS: f64 = 3.0;

/// AssemblyAI API client
pub struct AssemblyAiClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    words: Option<Vec<TranscriptWord>>,
    #[serde(default)]
    error: Option<String>,
}

/// One recognized word with millisecond timings
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptWord {
    pub text: String,
    pub start: u64,
    pub end: u64,
}

impl AssemblyAiClient {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
            poll_interval: Duration::from_secs(3),
        }
    }

    /// Override the API base URL (used by tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Transcribe an audio file, optionally pinning the language
    pub async fn transcribe(
        &self,
        audio_path: &Path,
        language: Option<&str>,
    ) -> Result<Transcript> {
        info!("Transcribing {} with AssemblyAI", audio_path.display());

        let upload_url = self.upload(audio_path).await?;
        let transcript_id = self.create_transcript(&upload_url, language).await?;
        let response = self.poll_transcript(&transcript_id).await?;

        let words = response.words.unwrap_or_default();
        let segments = group_words_into_segments(&words, SEGMENT_DURATION_SECS);
        debug!(
            "AssemblyAI produced {} words in {} segments",
            words.len(),
            segments.len()
        );

        Ok(Transcript {
            text: response.text.unwrap_or_default(),
            language: response
                .language_code
                .or_else(|| language.map(str::to_string)),
            segments,
        })
    }

    async fn upload(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path).await?;
        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .header("authorization", &self.api_key)
            .body(bytes)
            .send()
            .await
            .map_err(|e| TranscriptionError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptionError::ApiError(format!(
                "Upload failed with status {}",
                response.status()
            )));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::ApiError(e.to_string()))?;
        Ok(upload.upload_url)
    }

    async fn create_transcript(
        &self,
        audio_url: &str,
        language: Option<&str>,
    ) -> Result<String> {
        let body = json!({
            "audio_url": audio_url,
            "language_detection": language.is_none(),
            "language_code": language,
            "punctuate": true,
            "format_text": true,
        });

        let response = self
            .http
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranscriptionError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptionError::ApiError(format!(
                "Transcript creation failed with status {}",
                response.status()
            )));
        }

        let transcript: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::ApiError(e.to_string()))?;
        Ok(transcript.id)
    }

    async fn poll_transcript(&self, transcript_id: &str) -> Result<TranscriptResponse> {
        loop {
            let response = self
                .http
                .get(format!("{}/transcript/{}", self.base_url, transcript_id))
                .header("authorization", &self.api_key)
                .send()
                .await
                .map_err(|e| TranscriptionError::ApiError(e.to_string()))?;

            let transcript: TranscriptResponse = response
                .json()
                .await
                .map_err(|e| TranscriptionError::ApiError(e.to_string()))?;

            match transcript.status.as_str() {
                "completed" => return Ok(transcript),
                "error" => {
                    return Err(TranscriptionError::TranscriptionFailed(
                        transcript
                            .error
                            .unwrap_or_else(|| "unknown AssemblyAI error".to_string()),
                    ))
                }
                _ => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}

/// Regroup word timings into subtitle-sized segments.
///
/// A new segment starts once the current one spans more than
/// `segment_duration_secs` from its first word.
#[must_use]
pub fn group_words_into_segments(
    words: &[TranscriptWord],
    segment_duration_secs: f64,
) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut current_text = String::new();
    let mut current_start = 0.0_f64;

    for word in words {
        let word_start = word.start as f64 / 1000.0;

        if word_start - current_start > segment_duration_secs && !current_text.is_empty() {
            segments.push(TranscriptSegment {
                start_secs: current_start,
                end_secs: word_start,
                text: current_text.clone(),
            });
            current_text = word.text.clone();
            current_start = word_start;
        } else if current_text.is_empty() {
            current_text = word.text.clone();
            current_start = word_start;
        } else {
            current_text.push(' ');
            current_text.push_str(&word.text);
        }
    }

    if !current_text.is_empty() {
        let end_secs = words.last().map_or(current_start, |w| w.end as f64 / 1000.0);
        segments.push(TranscriptSegment {
            start_secs: current_start,
            end_secs,
            text: current_text,
        });
    }

    segments
}
