//! Two-pass loudness normalization with optional video re-encoding.

use super::{run_tool, run_tool_checked, stderr_tail};
use crate::config::{AudioNormalizationSettings, VideoCompressionSettings};
use crate::error::{Result, TolkError};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Loudnorm measurement from the first pass. ffmpeg reports the numbers as
/// JSON strings.
#[derive(Debug, Deserialize)]
struct LoudnormMeasurement {
    input_i: String,
    input_lra: String,
    input_tp: String,
    input_thresh: String,
    target_offset: String,
}

/// Normalize loudness (and optionally re-encode video) into a fast-start
/// MP4 next to the input in `temp_dir`. Returns the output path.
///
/// Pass 1 measures; pass 2 applies a linear loudnorm filter with the
/// measured parameters. A failed measurement downgrades to a stream copy
/// of the audio with a warning.
#[instrument(skip_all, fields(video = %video_path.display()))]
pub async fn normalize_audio(
    video_path: &Path,
    temp_dir: &Path,
    norm: &AudioNormalizationSettings,
    compression: &VideoCompressionSettings,
) -> Result<PathBuf> {
    std::fs::create_dir_all(temp_dir)?;

    let stem = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");
    let output_path = temp_dir.join(format!("{}.normalized.mp4", stem));

    let measurement = if norm.apply {
        match measure_loudness(video_path, norm).await {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("Loudness measurement failed; copying audio unchanged: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut args: Vec<OsString> = vec!["-i".into(), video_path.into()];

    match &measurement {
        Some(m) => {
            info!(
                "Applying loudnorm (measured I={} LRA={} TP={})",
                m.input_i, m.input_lra, m.input_tp
            );
            args.push("-af".into());
            args.push(
                format!(
                    "loudnorm=I={}:LRA={}:TP={}:measured_I={}:measured_LRA={}:measured_TP={}:measured_thresh={}:offset={}:linear=true",
                    norm.target_lufs,
                    norm.loudness_range,
                    norm.true_peak,
                    m.input_i,
                    m.input_lra,
                    m.input_tp,
                    m.input_thresh,
                    m.target_offset
                )
                .into(),
            );
            args.push("-c:a".into());
            args.push(norm.audio_codec.clone().into());
            args.push("-b:a".into());
            args.push(norm.audio_bitrate.clone().into());
        }
        None => {
            args.push("-c:a".into());
            args.push("copy".into());
        }
    }

    if compression.apply {
        args.push("-c:v".into());
        args.push(compression.codec.clone().into());
        if let Some(preset) = &compression.preset {
            args.push("-preset".into());
            args.push(preset.clone().into());
        }
        if let Some(crf) = compression.crf {
            args.push("-crf".into());
            args.push(crf.to_string().into());
        }
        if let Some(filter) = scale_filter(compression.max_width, compression.max_height) {
            args.push("-vf".into());
            args.push(filter.into());
        }
        args.push("-pix_fmt".into());
        args.push(compression.pixel_format.clone().into());
        if let Some(max_bitrate) = &compression.max_bitrate {
            args.push("-maxrate".into());
            args.push(max_bitrate.clone().into());
        }
        if let Some(buf_size) = &compression.buf_size {
            args.push("-bufsize".into());
            args.push(buf_size.clone().into());
        }
        if let Some(tune) = &compression.tune {
            args.push("-tune".into());
            args.push(tune.clone().into());
        }
    } else {
        args.push("-c:v".into());
        args.push("copy".into());
    }

    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push("-y".into());
    args.push("-loglevel".into());
    args.push("error".into());
    args.push(output_path.clone().into());

    run_tool_checked("ffmpeg", &args).await?;

    Ok(output_path)
}

/// Build the scale+pad filter that fits the video inside the configured box
/// without upscaling, keeping both dimensions even.
fn scale_filter(max_width: Option<u32>, max_height: Option<u32>) -> Option<String> {
    match (max_width, max_height) {
        (Some(w), Some(h)) => Some(format!(
            "scale=min({w}\\,iw):min({h}\\,ih):force_original_aspect_ratio=decrease,\
             pad=ceil(iw/2)*2:ceil(ih/2)*2"
        )),
        (Some(w), None) => Some(format!("scale=min({w}\\,iw):-2")),
        (None, Some(h)) => Some(format!("scale=-2:min({h}\\,ih)")),
        (None, None) => None,
    }
}

/// First pass: run loudnorm in measurement mode and parse the JSON block it
/// prints to stderr.
async fn measure_loudness(
    video_path: &Path,
    norm: &AudioNormalizationSettings,
) -> Result<LoudnormMeasurement> {
    let filter = format!(
        "loudnorm=I={}:LRA={}:TP={}:print_format=json",
        norm.target_lufs, norm.loudness_range, norm.true_peak
    );

    let args: Vec<OsString> = vec![
        "-i".into(),
        video_path.into(),
        "-af".into(),
        filter.into(),
        "-f".into(),
        "null".into(),
        "-".into(),
    ];

    let output = run_tool("ffmpeg", &args).await?;
    if !output.status.success() {
        return Err(TolkError::MediaTool {
            tool: "ffmpeg".to_string(),
            detail: stderr_tail(&output.stderr),
        });
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let json = extract_loudnorm_json(&stderr).ok_or_else(|| TolkError::MediaTool {
        tool: "ffmpeg".to_string(),
        detail: "no loudnorm JSON in measurement output".to_string(),
    })?;

    serde_json::from_str(json).map_err(|e| TolkError::MediaTool {
        tool: "ffmpeg".to_string(),
        detail: format!("unparseable loudnorm JSON: {}", e),
    })
}

/// Locate the loudnorm JSON block in ffmpeg's stderr.
fn extract_loudnorm_json(stderr: &str) -> Option<&str> {
    let from = stderr.rfind("Parsed_loudnorm").unwrap_or(0);
    let tail = &stderr[from..];
    let start = tail.find('{')?;
    let end = tail[start..].find('}')?;
    Some(&tail[start..start + end + 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_filter_forms() {
        let both = scale_filter(Some(1280), Some(720)).unwrap();
        assert!(both.contains("min(1280\\,iw)"));
        assert!(both.contains("pad=ceil(iw/2)*2"));

        let width_only = scale_filter(Some(640), None).unwrap();
        assert!(width_only.ends_with(":-2"));

        assert!(scale_filter(None, None).is_none());
    }

    #[test]
    fn test_extract_loudnorm_json_from_noisy_stderr() {
        let stderr = r#"frame= 1000 fps= 25 q=-0.0 size=N/A
[Parsed_loudnorm_0 @ 0x55e]
{
	"input_i" : "-23.61",
	"input_tp" : "-6.33",
	"input_lra" : "4.70",
	"input_thresh" : "-34.13",
	"output_i" : "-16.18",
	"output_tp" : "-2.10",
	"output_lra" : "3.80",
	"output_thresh" : "-26.53",
	"normalization_type" : "dynamic",
	"target_offset" : "0.18"
}
"#;
        let json = extract_loudnorm_json(stderr).unwrap();
        let parsed: LoudnormMeasurement = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.input_i, "-23.61");
        assert_eq!(parsed.target_offset, "0.18");
    }

    #[test]
    fn test_extract_loudnorm_json_missing() {
        assert!(extract_loudnorm_json("no json here").is_none());
    }
}
