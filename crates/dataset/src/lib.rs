//! Dataset assembly module
//!
//! Turns a video's metadata, transcript, frame text, and top comments into
//! JSONL fine-tuning records: the analysis text block as input, one viewer
//! comment as output.

pub mod stage;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::info;

use video_text_common::{Comment, OcrCapture, Result, Transcript, VideoMetadata};

pub use stage::AssembleDatasetStage;

/// Number of top comments paired into records
pub const TOP_COMMENTS: usize = 10;

/// Transcript excerpt length used in the analysis text
const TRANSCRIPT_EXCERPT_CHARS: usize = 500;

/// One fine-tuning record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetItem {
    pub input: String,
    pub output: String,
    pub metadata: DatasetItemMetadata,
}

/// Provenance carried along with each record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetItemMetadata {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub views: Option<u64>,
    pub duration_secs: Option<f64>,
    pub language: Option<String>,
    pub comment_likes: u64,
}

/// Build the analysis text block describing the video
#[must_use]
pub fn build_analysis_text(
    metadata: &VideoMetadata,
    transcript: &Transcript,
    ocr_captures: &[OcrCapture],
) -> String {
    let mut text = format!(
        "Video title: {}\nChannel: {}\nViews: {}\nDuration: {}s\n\nTranscript:\n{}...\n\nLanguage: {}",
        metadata.title.as_deref().unwrap_or("Unknown"),
        metadata.channel.as_deref().unwrap_or("Unknown"),
        metadata.views.unwrap_or(0),
        metadata.duration_secs.unwrap_or(0.0),
        transcript.excerpt(TRANSCRIPT_EXCERPT_CHARS),
        transcript.language.as_deref().unwrap_or("unknown"),
    );

    if !ocr_captures.is_empty() {
        text.push_str("\n\nOn-screen text:");
        for capture in ocr_captures {
            text.push_str(&format!("\n[{:.0}s] {}", capture.timestamp_secs, capture.text));
        }
    }

    text
}

/// Pair the analysis text with the top comments by like count
#[must_use]
pub fn assemble_items(
    metadata: &VideoMetadata,
    transcript: &Transcript,
    ocr_captures: &[OcrCapture],
    comments: &[Comment],
) -> Vec<DatasetItem> {
    let analysis_text = build_analysis_text(metadata, transcript, ocr_captures);

    let mut ranked: Vec<&Comment> = comments.iter().collect();
    ranked.sort_by(|a, b| b.likes.cmp(&a.likes));

    ranked
        .into_iter()
        .take(TOP_COMMENTS)
        .map(|comment| DatasetItem {
            input: analysis_text.clone(),
            output: comment.text.clone(),
            metadata: DatasetItemMetadata {
                video_id: metadata.video_id.clone(),
                title: metadata.title.clone(),
                channel: metadata.channel.clone(),
                views: metadata.views,
                duration_secs: metadata.duration_secs,
                language: transcript.language.clone(),
                comment_likes: comment.likes,
            },
        })
        .collect()
}

/// Write records as one JSON object per line
pub async fn write_jsonl(items: &[DatasetItem], path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    for item in items {
        let line = serde_json::to_string(item)
            .map_err(|e| video_text_common::MediaError::Other(e.to_string()))?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
    }
    file.flush().await?;
    info!("Wrote {} dataset records to {}", items.len(), path.display());
    Ok(())
}
