//! Stage adapter for dataset assembly

use async_trait::async_trait;

use video_text_orchestrator::{Stage, StageContext, StageError, TaskOutput};

use crate::{assemble_items, write_jsonl};

/// Writes the JSONL dataset into the output directory and finishes the run
///
/// Also removes the intermediate video and audio files.
pub struct AssembleDatasetStage;

#[async_trait]
impl Stage for AssembleDatasetStage {
    fn name(&self) -> &'static str {
        "assemble-dataset"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<String, StageError> {
        let metadata = ctx
            .artifacts
            .metadata
            .clone()
            .ok_or_else(|| StageError::invalid_input("No video metadata to assemble"))?;
        let transcript = ctx
            .artifacts
            .transcript
            .clone()
            .ok_or_else(|| StageError::invalid_input("No transcript to assemble"))?;

        let items = assemble_items(
            &metadata,
            &transcript,
            &ctx.artifacts.ocr_captures,
            &ctx.artifacts.comments,
        );

        tokio::fs::create_dir_all(&ctx.output_dir)
            .await
            .map_err(|e| StageError::internal(e.to_string()))?;
        let dataset_file = format!("{}_dataset.jsonl", ctx.task_id);
        write_jsonl(&items, &ctx.output_dir.join(&dataset_file))
            .await
            .map_err(|e| StageError::internal(e.to_string()))?;

        // Intermediate media is no longer needed
        if let Some(video) = &ctx.artifacts.video_path {
            let _ = tokio::fs::remove_file(video).await;
        }
        if let Some(audio) = &ctx.artifacts.audio_path {
            let _ = tokio::fs::remove_file(audio).await;
        }

        let count = items.len();
        ctx.artifacts.output = Some(TaskOutput::Dataset {
            dataset_file,
            items_count: count,
            video_title: metadata.title.clone(),
            video_duration_secs: metadata.duration_secs,
        });
        Ok(format!("Dataset created ({count} items)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use video_text_common::{Comment, Transcript, VideoMetadata};
    use video_text_orchestrator::StageContext;

    #[tokio::test]
    async fn test_assemble_dataset_writes_file_and_sets_output() {
        let out_dir = tempfile::tempdir().unwrap();
        let mut ctx = StageContext::new("task-9", "/tmp/unused", out_dir.path());
        ctx.artifacts.metadata = Some(VideoMetadata {
            title: Some("T".to_string()),
            duration_secs: Some(10.0),
            ..VideoMetadata::default()
        });
        ctx.artifacts.transcript = Some(Transcript {
            text: "words".to_string(),
            language: Some("en".to_string()),
            segments: vec![],
        });
        ctx.artifacts.comments = vec![Comment {
            author: None,
            text: "top comment".to_string(),
            likes: 7,
            published_at: None,
        }];

        let message = AssembleDatasetStage.run(&mut ctx).await.unwrap();
        assert_eq!(message, "Dataset created (1 items)");
        assert!(out_dir.path().join("task-9_dataset.jsonl").exists());

        match ctx.artifacts.output.unwrap() {
            TaskOutput::Dataset {
                dataset_file,
                items_count,
                video_title,
                video_duration_secs,
            } => {
                assert_eq!(dataset_file, "task-9_dataset.jsonl");
                assert_eq!(items_count, 1);
                assert_eq!(video_title.as_deref(), Some("T"));
                assert_eq!(video_duration_secs, Some(10.0));
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_assemble_dataset_without_metadata_is_invalid_input() {
        let mut ctx = StageContext::new("task-10", "/tmp/unused", "/tmp/out");
        let err = AssembleDatasetStage.run(&mut ctx).await.unwrap_err();
        assert_eq!(
            err.kind,
            video_text_orchestrator::StageErrorKind::InvalidInput
        );
    }
}
