//! YouTube source analysis module
//!
//! Collects video metadata through `yt-dlp --dump-json` and top viewer
//! comments through the YouTube Data API v3.

pub mod stage;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use video_text_common::{Comment, MediaError, Result, VideoMetadata};

pub use stage::{FetchCommentsStage, FetchMetadataStage};

const DATA_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Extract the video id from the common YouTube URL shapes
#[must_use]
pub fn extract_video_id(url: &str) -> Option<String> {
    let candidate = if let Some(rest) = url.split_once("watch?").map(|(_, q)| q) {
        // watch?v=ID or watch?foo=bar&v=ID
        rest.split('&')
            .find_map(|param| param.strip_prefix("v="))
            .map(str::to_string)
    } else if let Some(rest) = url.split_once("youtu.be/").map(|(_, p)| p) {
        Some(rest.to_string())
    } else if let Some(rest) = url.split_once("/shorts/").map(|(_, p)| p) {
        Some(rest.to_string())
    } else if let Some(rest) = url.split_once("/embed/").map(|(_, p)| p) {
        Some(rest.to_string())
    } else {
        None
    };

    let id: String = candidate?
        .chars()
        .take_while(|c| *c != '?' && *c != '&' && *c != '/')
        .collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Raw fields of interest from `yt-dlp --dump-json`
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    channel_id: Option<String>,
    uploader_id: Option<String>,
    description: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    upload_date: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    like_count: Option<u64>,
    comment_count: Option<u64>,
    webpage_url: Option<String>,
}

/// Collect metadata for a video URL through yt-dlp (no download)
pub async fn fetch_metadata(url: &str) -> Result<VideoMetadata> {
    info!("Collecting metadata for {}", url);

    let output = Command::new("yt-dlp")
        .arg("--dump-json")
        .arg("--skip-download")
        .arg("--no-playlist")
        .arg(url)
        .output()
        .await
        .map_err(|e| MediaError::from_spawn_error("yt-dlp", e))?;

    if !output.status.success() {
        return Err(MediaError::from_tool_output("yt-dlp", &output));
    }

    let info: YtDlpInfo = serde_json::from_slice(&output.stdout)
        .map_err(|e| MediaError::Other(format!("Failed to parse yt-dlp output: {e}")))?;

    let metadata = VideoMetadata {
        video_id: info.id,
        title: info.title,
        channel: info.uploader.or(info.channel),
        channel_id: info.channel_id.or(info.uploader_id),
        description: info.description,
        duration_secs: info.duration,
        views: info.view_count,
        publish_date: info.upload_date,
        thumbnail_url: info.thumbnail,
        keywords: info.tags,
        like_count: info.like_count,
        comment_count: info.comment_count,
        url: Some(info.webpage_url.unwrap_or_else(|| url.to_string())),
    };
    debug!("Collected metadata: {:?}", metadata.title);
    Ok(metadata)
}

/// YouTube Data API v3 client for comment collection
pub struct CommentsClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    author_display_name: Option<String>,
    text_display: String,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    published_at: Option<String>,
}

impl CommentsClient {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DATA_API_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Override the API base URL (used by tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch up to `max_results` top comments for a video, most liked first
    pub async fn fetch_top_comments(
        &self,
        video_id: &str,
        max_results: usize,
    ) -> Result<Vec<Comment>> {
        let max_results = max_results.min(100).to_string();
        let response = self
            .http
            .get(format!("{}/commentThreads", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id),
                ("order", "relevance"),
                ("maxResults", max_results.as_str()),
                ("textFormat", "plainText"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MediaError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MediaError::Http(format!(
                "commentThreads request failed with status {}",
                response.status()
            )));
        }

        let payload: CommentThreadsResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Http(e.to_string()))?;

        let mut comments: Vec<Comment> = payload
            .items
            .into_iter()
            .map(|thread| {
                let snippet = thread.snippet.top_level_comment.snippet;
                Comment {
                    author: snippet.author_display_name,
                    text: snippet.text_display,
                    likes: snippet.like_count,
                    published_at: snippet.published_at,
                }
            })
            .collect();
        comments.sort_by(|a, b| b.likes.cmp(&a.likes));

        info!("Collected {} comments for {}", comments.len(), video_id);
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=abc123&t=10s"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=PL1&v=abc123"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_extract_video_id_short_forms() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/abc123?rel=0"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_extract_video_id_rejects_non_video_urls() {
        assert_eq!(extract_video_id("https://example.com/video.mp4"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?t=10"), None);
        assert_eq!(extract_video_id("not a url"), None);
    }

    #[test]
    fn test_comment_threads_response_parsing() {
        let json = r#"{
            "items": [
                {
                    "snippet": {
                        "topLevelComment": {
                            "snippet": {
                                "authorDisplayName": "viewer",
                                "textDisplay": "great video",
                                "likeCount": 12,
                                "publishedAt": "2024-01-01T00:00:00Z"
                            }
                        }
                    }
                }
            ]
        }"#;
        let parsed: CommentThreadsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.items.len(), 1);
        let snippet = &parsed.items[0].snippet.top_level_comment.snippet;
        assert_eq!(snippet.text_display, "great video");
        assert_eq!(snippet.like_count, 12);
    }

    #[test]
    fn test_ytdlp_info_parsing_tolerates_missing_fields() {
        let info: YtDlpInfo = serde_json::from_str(r#"{ "id": "x", "title": "t" }"#).unwrap();
        assert_eq!(info.id.as_deref(), Some("x"));
        assert!(info.tags.is_empty());
        assert!(info.duration.is_none());
    }
}
