//! Stage adapters for transcription, translation, and subtitle assembly

use async_trait::async_trait;

use video_text_common::SubtitleFormat;
use video_text_orchestrator::{Stage, StageContext, StageError, TaskOutput};

use crate::{transcribe_with_whisper, AssemblyAiClient, TranscriptionConfig};

/// Which speech-to-text backend a transcribe stage uses
pub enum TranscribeBackend {
    /// Local whisper.cpp CLI
    Whisper(TranscriptionConfig),
    /// AssemblyAI REST API
    AssemblyAi {
        api_key: String,
        language: Option<String>,
    },
}

/// Transcribes the run's extracted audio track
pub struct TranscribeStage {
    backend: TranscribeBackend,
}

impl TranscribeStage {
    #[must_use]
    pub fn new(backend: TranscribeBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Stage for TranscribeStage {
    fn name(&self) -> &'static str {
        "transcribe"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        let audio_path = ctx
            .artifacts
            .audio_path
            .clone()
            .ok_or_else(|| StageError::invalid_input("No extracted audio to transcribe"))?;

        let transcript = match &self.backend {
            TranscribeBackend::Whisper(config) => {
                transcribe_with_whisper(&audio_path, config)
                    .await
                    .map_err(|e| StageError::external(e.to_string()))?
            }
            TranscribeBackend::AssemblyAi { api_key, language } => {
                AssemblyAiClient::new(api_key.clone())
                    .transcribe(&audio_path, language.as_deref())
                    .await
                    .map_err(|e| StageError::external(e.to_string()))?
            }
        };

        let message = match &transcript.language {
            Some(language) => format!("Transcription finished (language: {language})"),
            None => "Transcription finished".to_string(),
        };
        ctx.artifacts.transcript = Some(transcript);
        Ok(message)
    }
}

/// Produces an English translation of the run's audio track
pub struct TranslateStage {
    config: TranscriptionConfig,
}

impl TranslateStage {
    /// The given config is forced into translate mode
    #[must_use]
    pub fn new(config: TranscriptionConfig) -> Self {
        Self {
            config: config.translated(),
        }
    }
}

#[async_trait]
impl Stage for TranslateStage {
    fn name(&self) -> &'static str {
        "translate"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        let audio_path = ctx
            .artifacts
            .audio_path
            .clone()
            .ok_or_else(|| StageError::invalid_input("No extracted audio to translate"))?;

        let transcript = transcribe_with_whisper(&audio_path, &self.config)
            .await
            .map_err(|e| StageError::external(e.to_string()))?;
        ctx.artifacts.english_transcript = Some(transcript);
        Ok("Translated to English".to_string())
    }
}

/// Writes subtitle files into the output directory and finishes the run
///
/// Also removes the intermediate audio and source video, which are no longer
/// needed once subtitles exist.
pub struct AssembleSubtitlesStage {
    format: SubtitleFormat,
}

impl AssembleSubtitlesStage {
    #[must_use]
    pub fn new(format: SubtitleFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl Stage for AssembleSubtitlesStage {
    fn name(&self) -> &'static str {
        "assemble-subtitles"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        let transcript = ctx
            .artifacts
            .transcript
            .clone()
            .ok_or_else(|| StageError::invalid_input("No transcript to assemble"))?;

        tokio::fs::create_dir_all(&ctx.output_dir)
            .await
            .map_err(|e| StageError::internal(e.to_string()))?;

        let subtitle_file = format!("{}.{}", ctx.task_id, self.format.extension());
        let contents = crate::subtitle::compose(&transcript, self.format);
        tokio::fs::write(ctx.output_dir.join(&subtitle_file), contents)
            .await
            .map_err(|e| StageError::internal(e.to_string()))?;

        let english_subtitle_file = match &ctx.artifacts.english_transcript {
            Some(english) => {
                let name = format!("{}.en.srt", ctx.task_id);
                let contents = crate::subtitle::compose_srt(&english.segments);
                tokio::fs::write(ctx.output_dir.join(&name), contents)
                    .await
                    .map_err(|e| StageError::internal(e.to_string()))?;
                Some(name)
            }
            None => None,
        };

        // Intermediate media is no longer needed
        if let Some(audio) = &ctx.artifacts.audio_path {
            let _ = tokio::fs::remove_file(audio).await;
        }
        if let Some(video) = &ctx.artifacts.video_path {
            let _ = tokio::fs::remove_file(video).await;
        }

        ctx.artifacts.output = Some(TaskOutput::Subtitles {
            subtitle_file,
            english_subtitle_file,
            language: transcript.language.clone(),
        });
        Ok("Subtitles ready".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use video_text_common::{Transcript, TranscriptSegment};
    use video_text_orchestrator::StageContext;

    fn transcript() -> Transcript {
        Transcript {
            text: "Hello there.".to_string(),
            language: Some("en".to_string()),
            segments: vec![TranscriptSegment {
                start_secs: 0.0,
                end_secs: 1.0,
                text: "Hello there.".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_assemble_writes_subtitle_and_sets_output() {
        let out_dir = tempfile::tempdir().unwrap();
        let mut ctx = StageContext::new("task-1", "/tmp/unused", out_dir.path());
        ctx.artifacts.transcript = Some(transcript());

        let stage = AssembleSubtitlesStage::new(SubtitleFormat::Srt);
        let message = stage.run(&mut ctx).await.unwrap();
        assert_eq!(message, "Subtitles ready");

        let written = std::fs::read_to_string(out_dir.path().join("task-1.srt")).unwrap();
        assert!(written.contains("Hello there."));

        match ctx.artifacts.output.unwrap() {
            TaskOutput::Subtitles {
                subtitle_file,
                english_subtitle_file,
                language,
            } => {
                assert_eq!(subtitle_file, "task-1.srt");
                assert!(english_subtitle_file.is_none());
                assert_eq!(language.as_deref(), Some("en"));
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_assemble_writes_english_translation_when_present() {
        let out_dir = tempfile::tempdir().unwrap();
        let mut ctx = StageContext::new("task-2", "/tmp/unused", out_dir.path());
        ctx.artifacts.transcript = Some(transcript());
        ctx.artifacts.english_transcript = Some(transcript());

        let stage = AssembleSubtitlesStage::new(SubtitleFormat::Vtt);
        stage.run(&mut ctx).await.unwrap();

        assert!(out_dir.path().join("task-2.vtt").exists());
        assert!(out_dir.path().join("task-2.en.srt").exists());
    }

    #[tokio::test]
    async fn test_assemble_without_transcript_is_invalid_input() {
        let mut ctx = StageContext::new("task-3", "/tmp/unused", "/tmp/out");
        let stage = AssembleSubtitlesStage::new(SubtitleFormat::Srt);
        let err = stage.run(&mut ctx).await.unwrap_err();
        assert_eq!(
            err.kind,
            video_text_orchestrator::StageErrorKind::InvalidInput
        );
    }

    #[tokio::test]
    async fn test_transcribe_without_audio_is_invalid_input() {
        let mut ctx = StageContext::new("task-4", "/tmp/unused", "/tmp/out");
        let stage = TranscribeStage::new(TranscribeBackend::Whisper(TranscriptionConfig::default()));
        let err = stage.run(&mut ctx).await.unwrap_err();
        assert_eq!(
            err.kind,
            video_text_orchestrator::StageErrorKind::InvalidInput
        );
    }
}
