//! Video download module
//!
//! Downloads source media either directly over HTTP/HTTPS or through yt-dlp
//! for YouTube and other extractor-backed sites. Downloads land in the
//! caller's directory under a deterministic `source.<ext>` name so later
//! stages can find them without parsing tool output.

pub mod stage;

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use video_text_common::{MediaError, Result};

pub use stage::DownloadStage;

/// Download quality selection, mapped to a yt-dlp format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// Best available mp4 video+audio
    Best,
    /// Smallest available rendition
    Worst,
    /// Audio track only
    AudioOnly,
    /// Best rendition up to the given height (e.g. 720)
    MaxHeight(u32),
}

impl Quality {
    /// yt-dlp `-f` selector for this quality
    #[must_use]
    pub fn format_selector(self) -> String {
        match self {
            Quality::Best => {
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string()
            }
            Quality::Worst => "worst".to_string(),
            Quality::AudioOnly => "bestaudio/best".to_string(),
            Quality::MaxHeight(height) => format!("best[height<={height}]"),
        }
    }
}

/// Download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory the downloaded file is written into
    pub output_dir: PathBuf,
    pub quality: Quality,
}

impl DownloadConfig {
    #[must_use]
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            quality: Quality::Best,
        }
    }
}

/// Download a video through yt-dlp into the configured directory
pub async fn download_video(url: &str, config: &DownloadConfig) -> Result<PathBuf> {
    info!("Downloading video: {}", url);
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let template = config.output_dir.join("source.%(ext)s");
    let output = Command::new("yt-dlp")
        .arg("--no-playlist")
        .arg("--no-progress")
        .arg("-f")
        .arg(config.quality.format_selector())
        .arg("-o")
        .arg(&template)
        .arg(url)
        .output()
        .await
        .map_err(|e| MediaError::from_spawn_error("yt-dlp", e))?;

    if !output.status.success() {
        return Err(MediaError::from_tool_output("yt-dlp", &output));
    }

    let path = find_source_file(&config.output_dir).await?;
    info!("Downloaded video to {}", path.display());
    Ok(path)
}

/// Download a file from an HTTP/HTTPS URL into `dest_dir`
pub async fn download_from_url(url: &str, dest_dir: &Path) -> Result<PathBuf> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(MediaError::InvalidInput(format!(
            "Invalid URL scheme, only http:// and https:// are supported: {url}"
        )));
    }

    info!("Downloading file from URL: {}", url);
    tokio::fs::create_dir_all(dest_dir).await?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()
        .map_err(|e| MediaError::Http(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::Http(e.to_string()))?;

    if !response.status().is_success() {
        return Err(MediaError::Http(format!(
            "Request failed with status {}",
            response.status()
        )));
    }

    let extension = infer_extension_from_url(url).unwrap_or("tmp");
    let dest = dest_dir.join(format!("source.{extension}"));
    debug!("Writing download to {}", dest.display());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MediaError::Http(e.to_string()))?;

    let mut file = tokio::fs::File::create(&dest).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;

    info!("Downloaded {} bytes to {}", bytes.len(), dest.display());
    Ok(dest)
}

/// Locate the `source.*` file a download produced
async fn find_source_file(dir: &Path) -> Result<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with("source.") {
            return Ok(entry.path());
        }
    }
    Err(MediaError::Other(format!(
        "Download finished but no output file found in {}",
        dir.display()
    )))
}

/// Infer file extension from URL path
fn infer_extension_from_url(url: &str) -> Option<&str> {
    let path = url.split('?').next()?;
    let filename = path.split('/').next_back()?;
    if !filename.contains('.') {
        return None;
    }
    let extension = filename.split('.').next_back()?;
    // Only alphanumeric, max 5 chars
    if !extension.is_empty() && extension.len() <= 5 && extension.chars().all(char::is_alphanumeric)
    {
        Some(extension)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_format_selectors() {
        assert_eq!(
            Quality::Best.format_selector(),
            "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best"
        );
        assert_eq!(Quality::Worst.format_selector(), "worst");
        assert_eq!(Quality::AudioOnly.format_selector(), "bestaudio/best");
        assert_eq!(
            Quality::MaxHeight(720).format_selector(),
            "best[height<=720]"
        );
    }

    #[test]
    fn test_infer_extension_from_url() {
        assert_eq!(
            infer_extension_from_url("https://example.com/video.mp4"),
            Some("mp4")
        );
        assert_eq!(
            infer_extension_from_url("https://example.com/video.mp4?token=abc"),
            Some("mp4")
        );
        assert_eq!(infer_extension_from_url("https://example.com/file"), None);
        assert_eq!(
            infer_extension_from_url("https://example.com/file.toolongext"),
            None
        );
    }

    #[tokio::test]
    async fn test_download_rejects_bad_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let result = download_from_url("ftp://example.com/file.mp4", dir.path()).await;
        assert!(matches!(result, Err(MediaError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_find_source_file() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("source.mp4"), b"x")
            .await
            .unwrap();
        let found = find_source_file(dir.path()).await.unwrap();
        assert!(found.ends_with("source.mp4"));
    }

    #[tokio::test]
    async fn test_find_source_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_source_file(dir.path()).await.is_err());
    }
}
