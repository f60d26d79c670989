//! Stage adapter for audio extraction

use async_trait::async_trait;

use video_text_orchestrator::{Stage, StageContext, StageError};

use crate::{extract_audio, AudioConfig};

/// Extracts the audio track of the run's source video into its work directory
pub struct ExtractAudioStage {
    config: AudioConfig,
}

impl ExtractAudioStage {
    #[must_use]
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }
}

impl Default for ExtractAudioStage {
    fn default() -> Self {
        Self::new(AudioConfig::for_speech())
    }
}

#[async_trait]
impl Stage for ExtractAudioStage {
    fn name(&self) -> &'static str {
        "extract-audio"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        let video_path = ctx
            .artifacts
            .video_path
            .clone()
            .ok_or_else(|| StageError::invalid_input("No source video to extract audio from"))?;

        let output = ctx.work_dir.join("audio");
        let audio_path = extract_audio(&video_path, &output, &self.config).await?;
        ctx.artifacts.audio_path = Some(audio_path);
        Ok("Audio extracted".to_string())
    }
}
