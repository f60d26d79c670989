//! Stage adapter for frame text analysis

use async_trait::async_trait;

use video_text_orchestrator::{Stage, StageContext, StageError};

use crate::{analyze_video, FrameOcrConfig};

/// Runs OCR over sampled frames of the run's source video
pub struct AnalyzeFramesStage {
    config: FrameOcrConfig,
}

impl AnalyzeFramesStage {
    #[must_use]
    pub fn new(config: FrameOcrConfig) -> Self {
        Self { config }
    }
}

impl Default for AnalyzeFramesStage {
    fn default() -> Self {
        Self::new(FrameOcrConfig::default())
    }
}

#[async_trait]
impl Stage for AnalyzeFramesStage {
    fn name(&self) -> &'static str {
        "analyze-frames"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        let video_path = ctx
            .artifacts
            .video_path
            .clone()
            .ok_or_else(|| StageError::invalid_input("No source video to analyze"))?;

        let captures = analyze_video(&video_path, &ctx.work_dir, &self.config).await?;
        let count = captures.len();
        ctx.artifacts.ocr_captures = captures;
        Ok(format!("Frame text extracted ({count} captures)"))
    }
}
