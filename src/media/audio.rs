//! Audio extraction and container probing.

use super::{run_tool, run_tool_checked};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Result of extracting the transcription audio track.
#[derive(Debug)]
pub struct ExtractedAudio {
    pub audio_path: PathBuf,
    /// Container duration, rounded to whole seconds; `None` when probing
    /// fails (non-fatal).
    pub duration_seconds: Option<u64>,
}

/// Extract a mono 16 kHz 16-bit PCM WAV for the transcription engine and
/// probe the container duration.
#[instrument(skip_all, fields(video = %video_path.display()))]
pub async fn extract_audio(video_path: &Path, temp_dir: &Path) -> Result<ExtractedAudio> {
    std::fs::create_dir_all(temp_dir)?;

    let stem = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");
    let audio_path = temp_dir.join(format!("{}.wav", stem));

    info!("Extracting audio track");

    run_tool_checked(
        "ffmpeg",
        &[
            "-i".as_ref(),
            video_path.as_os_str(),
            "-vn".as_ref(),
            "-acodec".as_ref(),
            "pcm_s16le".as_ref(),
            "-ar".as_ref(),
            "16000".as_ref(),
            "-ac".as_ref(),
            "1".as_ref(),
            "-y".as_ref(),
            "-loglevel".as_ref(),
            "error".as_ref(),
            audio_path.as_os_str(),
        ],
    )
    .await?;

    let duration_seconds = match probe_duration_seconds(video_path).await {
        Ok(duration) => Some(duration),
        Err(e) => {
            warn!("Duration probe failed (continuing without it): {}", e);
            None
        }
    };

    Ok(ExtractedAudio {
        audio_path,
        duration_seconds,
    })
}

/// Query the container duration using ffprobe's JSON output.
pub async fn probe_duration_seconds(path: &Path) -> Result<u64> {
    let output = run_tool(
        "ffprobe",
        &[
            "-v".as_ref(),
            "quiet".as_ref(),
            "-print_format".as_ref(),
            "json".as_ref(),
            "-show_format".as_ref(),
            path.as_os_str(),
        ],
    )
    .await?;

    if !output.status.success() {
        return Err(crate::error::TolkError::MediaTool {
            tool: "ffprobe".to_string(),
            detail: super::stderr_tail(&output.stderr),
        });
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&json_str).map_err(|_| {
        crate::error::TolkError::MediaTool {
            tool: "ffprobe".to_string(),
            detail: "invalid JSON output".to_string(),
        }
    })?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .map(|d| d.round() as u64)
        .ok_or_else(|| crate::error::TolkError::MediaTool {
            tool: "ffprobe".to_string(),
            detail: "could not determine container duration".to_string(),
        })
}
