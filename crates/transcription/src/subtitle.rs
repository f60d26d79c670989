//! Subtitle composition from transcript segments

use video_text_common::{SubtitleFormat, Transcript, TranscriptSegment};

/// Compose a subtitle document in the given format
#[must_use]
pub fn compose(transcript: &Transcript, format: SubtitleFormat) -> String {
    match format {
        SubtitleFormat::Srt => compose_srt(&transcript.segments),
        SubtitleFormat::Vtt => compose_vtt(&transcript.segments),
    }
}

/// Compose an SRT document
#[must_use]
pub fn compose_srt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp(segment.start_secs, ','),
            format_timestamp(segment.end_secs, ','),
            segment.text.trim()
        ));
    }
    out
}

/// Compose a WebVTT document
#[must_use]
pub fn compose_vtt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in segments {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_timestamp(segment.start_secs, '.'),
            format_timestamp(segment.end_secs, '.'),
            segment.text.trim()
        ));
    }
    out
}

/// Format seconds as `HH:MM:SS<sep>mmm`
fn format_timestamp(secs: f64, millis_sep: char) -> String {
    let total_millis = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}{millis_sep}{millis:03}")
}
