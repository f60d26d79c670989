//! Pipeline construction for the two job kinds

use std::sync::Arc;

use video_text_audio_extractor::{AudioConfig, ExtractAudioStage};
use video_text_common::SubtitleFormat;
use video_text_dataset::AssembleDatasetStage;
use video_text_downloader::DownloadStage;
use video_text_frame_ocr::AnalyzeFramesStage;
use video_text_orchestrator::Stage;
use video_text_transcription::{
    AssembleSubtitlesStage, TranscribeBackend, TranscribeStage, TranscriptionConfig,
    TranslateStage, WhisperModel,
};
use video_text_youtube::{FetchCommentsStage, FetchMetadataStage};

use crate::types::ProcessRequest;
use crate::ServerConfig;

/// Validated options for a subtitle job
#[derive(Debug, Clone)]
pub struct SubtitleOptions {
    pub model: WhisperModel,
    pub language: Option<String>,
    pub format: SubtitleFormat,
    pub translate_english: bool,
    /// Present when transcription goes through AssemblyAI
    pub assemblyai_api_key: Option<String>,
}

impl SubtitleOptions {
    /// Validate a raw request against the server configuration.
    ///
    /// Fails at submission time — before any task exists — when the model
    /// size or subtitle format is unknown, or a required credential is
    /// missing.
    pub fn from_request(request: &ProcessRequest, config: &ServerConfig) -> Result<Self, String> {
        let model = WhisperModel::parse(&request.model_size)
            .ok_or_else(|| format!("Unknown model size: {}", request.model_size))?;
        let format = SubtitleFormat::parse(&request.subtitle_format)
            .ok_or_else(|| format!("Unknown subtitle format: {}", request.subtitle_format))?;

        let assemblyai_api_key = if request.use_assemblyai {
            let key = request
                .assemblyai_api_key
                .clone()
                .or_else(|| config.assemblyai_api_key.clone())
                .ok_or_else(|| "AssemblyAI API key is required".to_string())?;
            Some(key)
        } else {
            None
        };

        Ok(Self {
            model,
            language: request.language.clone(),
            format,
            translate_english: request.translate_english,
            assemblyai_api_key,
        })
    }
}

/// Stages for a subtitle job over an already-uploaded video
pub fn subtitle_stages(options: &SubtitleOptions, config: &ServerConfig) -> Vec<Arc<dyn Stage>> {
    let whisper_config = TranscriptionConfig::new(options.model, &config.model_dir)
        .with_language(options.language.clone());

    let mut stages: Vec<Arc<dyn Stage>> =
        vec![Arc::new(ExtractAudioStage::new(AudioConfig::for_speech()))];

    match &options.assemblyai_api_key {
        Some(api_key) => stages.push(Arc::new(TranscribeStage::new(
            TranscribeBackend::AssemblyAi {
                api_key: api_key.clone(),
                language: options.language.clone(),
            },
        ))),
        None => stages.push(Arc::new(TranscribeStage::new(TranscribeBackend::Whisper(
            whisper_config.clone(),
        )))),
    }

    if options.translate_english && options.language.as_deref() != Some("en") {
        stages.push(Arc::new(TranslateStage::new(whisper_config)));
    }

    stages.push(Arc::new(AssembleSubtitlesStage::new(options.format)));
    stages
}

/// Stages for a dataset job over a YouTube URL
pub fn dataset_stages(
    youtube_url: &str,
    youtube_api_key: Option<String>,
    use_ocr: bool,
    model: WhisperModel,
    config: &ServerConfig,
) -> Vec<Arc<dyn Stage>> {
    let whisper_config = TranscriptionConfig::new(model, &config.model_dir);

    let mut stages: Vec<Arc<dyn Stage>> = vec![
        Arc::new(FetchMetadataStage::new(youtube_url)),
        Arc::new(FetchCommentsStage::new(youtube_api_key)),
        Arc::new(DownloadStage::new(youtube_url)),
        Arc::new(ExtractAudioStage::new(AudioConfig::for_speech())),
        Arc::new(TranscribeStage::new(TranscribeBackend::Whisper(
            whisper_config,
        ))),
    ];

    if use_ocr {
        stages.push(Arc::new(AnalyzeFramesStage::default()));
    }

    stages.push(Arc::new(AssembleDatasetStage));
    stages
}
