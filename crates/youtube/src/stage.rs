//! Stage adapters for metadata and comment collection

use async_trait::async_trait;
use tracing::warn;

use video_text_orchestrator::{Stage, StageContext, StageError};

use crate::{fetch_metadata, CommentsClient};

/// Collects source video metadata for the run
pub struct FetchMetadataStage {
    url: String,
}

impl FetchMetadataStage {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Stage for FetchMetadataStage {
    fn name(&self) -> &'static str {
        "fetch-metadata"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        let metadata = fetch_metadata(&self.url).await?;
        let message = match &metadata.title {
            Some(title) => format!("Metadata collected: {title}"),
            None => "Metadata collected".to_string(),
        };
        ctx.artifacts.metadata = Some(metadata);
        Ok(message)
    }
}

/// Collects top viewer comments for the run's video
///
/// Without an API key the stage succeeds with zero comments; a dataset
/// without comments is still assemblable.
pub struct FetchCommentsStage {
    api_key: Option<String>,
    max_results: usize,
}

impl FetchCommentsStage {
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            max_results: 50,
        }
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl Stage for FetchCommentsStage {
    fn name(&self) -> &'static str {
        "fetch-comments"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        let Some(api_key) = &self.api_key else {
            warn!("No YouTube API key configured, skipping comment collection");
            return Ok("Comments skipped (no API key)".to_string());
        };

        let video_id = ctx
            .artifacts
            .metadata
            .as_ref()
            .and_then(|m| m.video_id.clone())
            .ok_or_else(|| StageError::invalid_input("No video id to collect comments for"))?;

        let comments = CommentsClient::new(api_key.clone())
            .fetch_top_comments(&video_id, self.max_results)
            .await?;
        let count = comments.len();
        ctx.artifacts.comments = comments;
        Ok(format!("Comments collected ({count})"))
    }
}
