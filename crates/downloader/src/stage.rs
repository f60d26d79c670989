//! Stage adapter for video download

use async_trait::async_trait;

use video_text_orchestrator::{Stage, StageContext, StageError};

use crate::{download_video, DownloadConfig, Quality};

/// Downloads the source video into the run's work directory
pub struct DownloadStage {
    url: String,
    quality: Quality,
}

impl DownloadStage {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quality: Quality::Best,
        }
    }

    #[must_use]
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}

#[async_trait]
impl Stage for DownloadStage {
    fn name(&self) -> &'static str {
        "download"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        let config = DownloadConfig {
            output_dir: ctx.work_dir.clone(),
            quality: self.quality,
        };
        let path = download_video(&self.url, &config).await?;
        ctx.artifacts.video_path = Some(path);
        Ok("Video downloaded".to_string())
    }
}
